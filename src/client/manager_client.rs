//! Connection from a worker to the manager's request/reply socket.

use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use super::error::{ClientError, ClientResult};
use crate::config::NowcastConfig;
use crate::constants::msg_types;
use crate::messaging::{decode, encode, Message};
use crate::registry::LogLevel;

/// How long a worker waits for the manager to reply
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// A worker's connection to the manager
///
/// Requests and replies strictly alternate; each `tell` waits for the reply
/// to its own message before returning.
pub struct ManagerClient {
    stream: BufReader<TcpStream>,
    source: String,
    reply_timeout: Duration,
}

impl ManagerClient {
    /// Connect to the manager at `address` as worker `source`
    pub async fn connect(address: &str, source: impl Into<String>) -> ClientResult<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| ClientError::connect(address, e))?;
        let source = source.into();
        debug!(address = %address, source = %source, "Connected to manager");

        Ok(Self {
            stream: BufReader::new(stream),
            source,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        })
    }

    /// Connect to the manager named in `config` (`manager host` and `ports.backend`)
    pub async fn for_config(
        config: &NowcastConfig,
        source: impl Into<String>,
    ) -> ClientResult<Self> {
        let address = format!("{}:{}", config.manager_host(), config.backend_port());
        Self::connect(&address, source).await
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Send `(source, msg_type, payload)` and return the manager's reply
    ///
    /// An `undefined msg` reply is returned as-is; use [`ManagerClient::tell`]
    /// to treat it as an error.
    pub async fn send(&mut self, msg_type: &str, payload: Value) -> ClientResult<Message> {
        let mut line = encode(&self.source, msg_type, &payload);
        line.push('\n');
        self.stream.get_mut().write_all(line.as_bytes()).await?;

        let mut reply = String::new();
        let read = tokio::time::timeout(self.reply_timeout, self.stream.read_line(&mut reply))
            .await
            .map_err(|_| ClientError::Timeout {
                msg_type: msg_type.to_string(),
            })??;
        if read == 0 {
            return Err(ClientError::ConnectionClosed);
        }

        let reply = decode(reply.as_bytes())?;
        debug!(source = %self.source, msg_type = %msg_type, reply = %reply, "Manager replied");
        Ok(reply)
    }

    /// Send a message and require an acknowledgement
    pub async fn tell(&mut self, msg_type: &str, payload: Value) -> ClientResult<Message> {
        let reply = self.send(msg_type, payload).await?;
        if reply.is_undefined() {
            return Err(ClientError::Rejected {
                source_name: self.source.clone(),
                msg_type: msg_type.to_string(),
            });
        }
        Ok(reply)
    }

    /// Ask for a stage's checklist value; null when the stage is absent
    pub async fn need(&mut self, stage: &str) -> ClientResult<Value> {
        let reply = self
            .tell(msg_types::NEED, Value::String(stage.to_string()))
            .await?;
        Ok(reply.payload)
    }

    /// Forward a log record to the manager's log for this worker
    pub async fn log(&mut self, level: LogLevel, message: &str) -> ClientResult<()> {
        let msg_type = format!("{}.{}", msg_types::LOG_PREFIX, level.as_str().to_lowercase());
        self.tell(&msg_type, Value::String(message.to_string())).await?;
        Ok(())
    }

    /// Report that the worker stopped on an unexpected error
    pub async fn crash(&mut self) -> ClientResult<()> {
        self.tell(msg_types::CRASH, Value::Null).await?;
        Ok(())
    }

    /// Tell the manager this worker has finished
    pub async fn the_end(&mut self) -> ClientResult<()> {
        self.tell(msg_types::THE_END, Value::Null).await?;
        Ok(())
    }
}

/// Send one message to the manager named in `config` and return its reply
pub async fn tell_manager(
    config: &NowcastConfig,
    source: &str,
    msg_type: &str,
    payload: Value,
) -> ClientResult<Message> {
    let mut client = ManagerClient::for_config(config, source).await?;
    client.send(msg_type, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Minimal manager stand-in answering every line with `reply`
    async fn fake_manager(reply: Message) -> (String, tokio::task::JoinHandle<Vec<Message>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut stream = BufReader::new(stream);
            let mut received = Vec::new();
            let mut line = String::new();
            while stream.read_line(&mut line).await.unwrap() > 0 {
                received.push(decode(line.as_bytes()).unwrap());
                let mut out = reply.encode();
                out.push('\n');
                stream.get_mut().write_all(out.as_bytes()).await.unwrap();
                line.clear();
            }
            received
        });
        (address, handle)
    }

    #[tokio::test]
    async fn test_need_returns_reply_payload() {
        let (address, handle) = fake_manager(Message::ack(json!({"06 forecast": true}))).await;

        let mut client = ManagerClient::connect(&address, "download_weather").await.unwrap();
        let value = client.need("weather").await.unwrap();
        drop(client);

        assert_eq!(value, json!({"06 forecast": true}));
        let received = handle.await.unwrap();
        assert_eq!(received, vec![Message::new("download_weather", "need", json!("weather"))]);
    }

    #[tokio::test]
    async fn test_log_uses_level_msg_type() {
        let (address, handle) = fake_manager(Message::ack(Value::Null)).await;

        let mut client = ManagerClient::connect(&address, "make_plots").await.unwrap();
        client.log(LogLevel::Warning, "slow plot").await.unwrap();
        client.the_end().await.unwrap();
        drop(client);

        let received = handle.await.unwrap();
        assert_eq!(received[0].msg_type, "log.warning");
        assert_eq!(received[0].payload, json!("slow plot"));
        assert_eq!(received[1].msg_type, "the end");
    }

    #[tokio::test]
    async fn test_undefined_reply_is_rejection() {
        let (address, _handle) = fake_manager(Message::undefined()).await;

        let mut client = ManagerClient::connect(&address, "make_plots").await.unwrap();
        let reply = client.send("bogus", Value::Null).await.unwrap();
        assert!(reply.is_undefined());

        let result = client.tell("bogus", Value::Null).await;
        assert!(matches!(
            result,
            Err(ClientError::Rejected { ref msg_type, .. }) if msg_type == "bogus"
        ));
    }

    #[tokio::test]
    async fn test_crash_then_the_end() {
        let (address, handle) = fake_manager(Message::ack(Value::Null)).await;

        let mut client = ManagerClient::connect(&address, "run_NEMO").await.unwrap();
        client.crash().await.unwrap();
        client.the_end().await.unwrap();
        drop(client);

        let types: Vec<String> = handle.await.unwrap().into_iter().map(|m| m.msg_type).collect();
        assert_eq!(types, vec!["crash", "the end"]);
    }

    #[tokio::test]
    async fn test_silent_manager_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let _silent = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let mut client = ManagerClient::connect(&address, "watch_NEMO")
            .await
            .unwrap()
            .with_reply_timeout(Duration::from_millis(100));
        let result = client.need("NEMO run").await;

        assert!(matches!(result, Err(ClientError::Timeout { ref msg_type }) if msg_type == "need"));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = ManagerClient::connect(&address, "make_plots").await;
        assert!(matches!(result, Err(ClientError::Connect { .. })));
    }
}
