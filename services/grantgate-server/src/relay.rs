//! HTTP relayer client
//!
//! Performs guarded transfers by handing them to an external relayer. Any
//! non-2xx answer, transport error or timeout is a failed transfer.

use std::time::Duration;

use async_trait::async_trait;
use grantgate_core::{TransferExecutor, TransferFailure, TransferReceipt, TransferRequest};
use serde::{Deserialize, Serialize};

/// Body posted to the relayer
#[derive(Debug, Serialize)]
struct RelayTransfer<'a> {
    request_id: String,
    sender: &'a str,
    receiver: &'a str,
    source_port: &'a str,
    source_channel: &'a str,
    denom: &'a str,
    amount: String,
    memo: String,
}

impl<'a> From<&'a TransferRequest> for RelayTransfer<'a> {
    fn from(request: &'a TransferRequest) -> Self {
        Self {
            request_id: request.request_id.to_string(),
            sender: request.sender.as_str(),
            receiver: request.receiver.as_str(),
            source_port: request.source_port.as_str(),
            source_channel: request.source_channel.as_str(),
            denom: request.token.denom.as_str(),
            amount: request.token.amount.to_string(),
            memo: format!("authz exec by {}", request.grantee),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelayAck {
    #[serde(alias = "txhash", alias = "tx_hash")]
    transfer_id: Option<String>,
}

/// `TransferExecutor` that forwards transfers to a relayer over HTTP
pub struct RelayerTransferExecutor {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RelayerTransferExecutor {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            timeout,
            client,
        })
    }
}

#[async_trait]
impl TransferExecutor for RelayerTransferExecutor {
    async fn perform_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<TransferReceipt, TransferFailure> {
        let resp = self
            .client
            .post(&self.url)
            .json(&RelayTransfer::from(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransferFailure::TimedOut(self.timeout.as_millis() as u64)
                } else {
                    TransferFailure::Unavailable(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(
                %status,
                body = %body,
                request_id = %request.request_id,
                "Relayer refused transfer"
            );
            return Err(TransferFailure::Rejected(format!("relayer returned {status}: {body}")));
        }

        // An empty or unrecognised acknowledgement still means the transfer went through
        let ack: Option<RelayAck> = resp.json().await.ok();
        let transfer_id = ack
            .and_then(|ack| ack.transfer_id)
            .unwrap_or_else(|| request.request_id.to_string());

        Ok(TransferReceipt::new(transfer_id))
    }
}
