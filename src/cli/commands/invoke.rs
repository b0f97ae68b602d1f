//! Invoke command implementation
//!
//! This module implements the `invoke` command, which runs one of the
//! request handlers locally and prints its response.

use crate::handlers::{echo, random_number, LocalContext};
use clap::{Args, Subcommand};
use serde_json::{json, Value};

/// Arguments for the invoke command
#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Handler to invoke
    #[command(subcommand)]
    pub handler: Handler,

    /// Request id reported in the response
    #[arg(long, global = true)]
    pub request_id: Option<String>,
}

/// Available handlers
#[derive(Subcommand, Debug)]
pub enum Handler {
    /// Return a random number between 1 and 1000
    Random,

    /// Echo a JSON request body
    Echo {
        /// Raw request body, parsed as JSON by the handler
        #[arg(long)]
        body: Option<String>,
    },
}

impl InvokeArgs {
    /// Execute the invoke command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let ctx = self
            .request_id
            .as_deref()
            .map(LocalContext::with_request_id)
            .unwrap_or_default();

        let response = match &self.handler {
            Handler::Random => random_number(&ctx),
            Handler::Echo { body } => {
                let event = match body {
                    Some(raw) => json!({ "body": raw }),
                    None => Value::Object(Default::default()),
                };
                echo(&event, &ctx)
            }
        };

        println!("{}", serde_json::to_string_pretty(&response)?);

        Ok(if response.status_code == 200 { 0 } else { 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invoke_echo_status_codes() {
        let ok = InvokeArgs {
            handler: Handler::Echo {
                body: Some(r#"{"name":"test"}"#.to_string()),
            },
            request_id: None,
        };
        assert_eq!(ok.execute().await.unwrap(), 0);

        let bad = InvokeArgs {
            handler: Handler::Echo {
                body: Some("{broken".to_string()),
            },
            request_id: Some("req-1".to_string()),
        };
        assert_eq!(bad.execute().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invoke_random() {
        let args = InvokeArgs {
            handler: Handler::Random,
            request_id: None,
        };
        assert_eq!(args.execute().await.unwrap(), 0);
    }
}
