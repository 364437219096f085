//! AmqpSink - publishes samples to an AMQP 1.0 queue
//!
//! Every delivery opens its own connection, session and sender link, sends
//! one message per sample and closes everything again.

use std::collections::HashMap;
use std::time::Instant;

use fe2o3_amqp::connection::ConnectionHandle;
use fe2o3_amqp::sasl_profile::SaslProfile;
use fe2o3_amqp::types::messaging::{Message, Outcome};
use fe2o3_amqp::types::primitives::Binary;
use fe2o3_amqp::{Connection, Sender, Session};
use serde::Serialize;
use tracing::{debug, error, instrument};

use contracts::{ContractError, Sample, SampleSink, Series};

/// Configuration for AmqpSink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmqpSinkConfig {
    /// Broker URL (`amqp://` or `amqps://`)
    pub address: String,
    /// Target queue
    pub queue: String,
    /// SASL PLAIN `(username, password)`
    pub credentials: Option<(String, String)>,
}

impl AmqpSinkConfig {
    /// Create config from params map
    ///
    /// Recognized keys: `address`, `queue`, `access_key_name`, `access_key`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let address = params
            .get("address")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "missing 'address' parameter".to_string())?;

        if !(address.starts_with("amqp://") || address.starts_with("amqps://")) {
            return Err(format!(
                "invalid address '{}': expected amqp:// or amqps:// scheme",
                address
            ));
        }

        let queue = params
            .get("queue")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "missing 'queue' parameter".to_string())?;

        let username = params.get("access_key_name").filter(|s| !s.is_empty());
        let password = params.get("access_key").filter(|s| !s.is_empty());
        let credentials = match (username, password) {
            (Some(u), Some(p)) => Some((u.clone(), p.clone())),
            _ => None,
        };

        Ok(Self {
            address: address.clone(),
            queue: queue.clone(),
            credentials,
        })
    }
}

/// JSON body of one message, in Prometheus' sample encoding:
/// `{"metric":{...},"value":[<unix seconds>,"<value>"]}`
#[derive(Debug, Serialize)]
pub struct SampleMessage<'a> {
    pub metric: &'a Series,
    pub value: (f64, String),
}

impl<'a> SampleMessage<'a> {
    pub fn new(sample: &'a Sample) -> Self {
        Self {
            metric: &sample.series,
            value: (sample.timestamp_ms as f64 / 1000.0, sample.value.to_string()),
        }
    }
}

/// Sink that sends samples to an AMQP 1.0 broker
pub struct AmqpSink {
    name: String,
    config: AmqpSinkConfig,
}

impl AmqpSink {
    /// Create a new AmqpSink; no connection is made until the first delivery
    pub fn new(name: impl Into<String>, config: AmqpSinkConfig) -> Self {
        let name = name.into();
        debug!(
            sink = %name,
            address = %config.address,
            queue = %config.queue,
            sasl = config.credentials.is_some(),
            "AMQP writer configured"
        );
        Self { name, config }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = AmqpSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks[{name}].params"), e))?;
        Ok(Self::new(name, config))
    }

    /// Sink configuration
    pub fn config(&self) -> &AmqpSinkConfig {
        &self.config
    }

    fn prepare_payload(&self, sample: &Sample) -> Result<Vec<u8>, ContractError> {
        serde_json::to_vec(&SampleMessage::new(sample))
            .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {e}")))
    }

    async fn connect(&self) -> Result<ConnectionHandle<()>, ContractError> {
        let container_id = format!("{}-{}", self.name, std::process::id());
        let mut builder = Connection::builder().container_id(container_id);
        if let Some((username, password)) = &self.config.credentials {
            builder = builder.sasl_profile(SaslProfile::Plain {
                username: username.clone(),
                password: password.clone(),
            });
        }

        builder
            .open(self.config.address.as_str())
            .await
            .map_err(|e| ContractError::sink_connection(&self.name, format!("dial: {e}")))
    }

    /// Send every sample, continuing past individual failures
    async fn transmit(&self, sender: &mut Sender, samples: &[Sample]) -> (usize, Option<String>) {
        let mut failed = 0;
        let mut first_error = None;

        for sample in samples {
            let result = match self.prepare_payload(sample) {
                Ok(data) => match sender
                    .send(Message::builder().data(Binary::from(data)).build())
                    .await
                {
                    Ok(Outcome::Accepted(_)) => Ok(()),
                    Ok(other) => Err(format!("message not accepted: {other:?}")),
                    Err(e) => Err(format!("send: {e}")),
                },
                Err(e) => Err(e.to_string()),
            };

            if let Err(e) = result {
                error!(sink = %self.name, error = %e, "Error sending message");
                failed += 1;
                first_error.get_or_insert(e);
            }
        }

        (failed, first_error)
    }

    async fn send_batch(&self, samples: &[Sample]) -> Result<(), ContractError> {
        let mut connection = self.connect().await?;

        let mut session = match Session::begin(&mut connection).await {
            Ok(session) => session,
            Err(e) => {
                let _ = connection.close().await;
                return Err(ContractError::sink_connection(
                    &self.name,
                    format!("session: {e}"),
                ));
            }
        };

        let link_name = format!("{}-sender", self.name);
        let mut sender =
            match Sender::attach(&mut session, link_name, self.config.queue.as_str()).await {
                Ok(sender) => sender,
                Err(e) => {
                    let _ = session.end().await;
                    let _ = connection.close().await;
                    return Err(ContractError::sink_connection(
                        &self.name,
                        format!("link to queue '{}': {e}", self.config.queue),
                    ));
                }
            };

        let (failed, first_error) = self.transmit(&mut sender, samples).await;

        if let Err(e) = sender.close().await {
            debug!(sink = %self.name, error = %e, "Sender close failed");
        }
        if let Err(e) = session.end().await {
            debug!(sink = %self.name, error = %e, "Session end failed");
        }
        if let Err(e) = connection.close().await {
            debug!(sink = %self.name, error = %e, "Connection close failed");
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(ContractError::sink_write(
                &self.name,
                format!("{failed} of {} samples failed, first: {e}", samples.len()),
            )),
        }
    }
}

impl SampleSink for AmqpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "amqp_sink_deliver",
        skip(self, samples, deadline),
        fields(sink = %self.name, queue = %self.config.queue, samples = samples.len())
    )]
    async fn deliver(&self, samples: &[Sample], deadline: Instant) -> Result<(), ContractError> {
        let deadline = tokio::time::Instant::from_std(deadline);
        tokio::time::timeout_at(deadline, self.send_batch(samples))
            .await
            .map_err(|_| ContractError::deadline_exceeded(&self.name))?
    }
}
