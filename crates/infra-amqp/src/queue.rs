// lapin DurableQueue Implementation

use crate::connection::AmqpEndpoint;
use crate::error::map_lapin_error;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions,
    BasicQosOptions, BasicRejectOptions, ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use mlb_stats_core::error::{AppError, Result};
use mlb_stats_core::port::{Delivery, DeliveryAcker, DurableQueue, Subscription};
use tracing::{debug, info};
use uuid::Uuid;

const REPLY_SUCCESS: u16 = 200;
/// AMQP delivery mode for messages that survive a broker restart
const PERSISTENT: u8 = 2;

/// One broker connection plus a confirm-mode channel for publishing.
/// Every subscription opens its own channel on the same connection.
pub struct AmqpQueue {
    connection: Connection,
    publisher: Channel,
}

impl AmqpQueue {
    /// Connect to the broker. Any failure here is `AppError::Connection`.
    pub async fn connect(endpoint: &AmqpEndpoint) -> Result<Self> {
        let uri = endpoint.uri();
        info!(host = %endpoint.host, port = endpoint.port, "Connecting to RabbitMQ");

        let connection = Connection::connect(&uri, ConnectionProperties::default())
            .await
            .map_err(|e| {
                AppError::Connection(format!(
                    "Connection to RabbitMQ server at {}:{} failed: {}",
                    endpoint.host, endpoint.port, e
                ))
            })?;

        let publisher = connection.create_channel().await.map_err(map_lapin_error)?;
        publisher
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(map_lapin_error)?;

        Ok(Self {
            connection,
            publisher,
        })
    }
}

#[async_trait]
impl DurableQueue for AmqpQueue {
    async fn declare_queue(&self, name: &str, durable: bool) -> Result<()> {
        self.publisher
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(map_lapin_error)?;
        debug!(queue = name, durable, "Queue declared");
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()> {
        let confirmation = self
            .publisher
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await
            .map_err(map_lapin_error)?
            .await
            .map_err(map_lapin_error)?;

        if confirmation.is_nack() {
            return Err(AppError::Broker(format!(
                "broker did not accept message for queue '{}'",
                queue
            )));
        }
        Ok(())
    }

    async fn subscribe(&self, queue: &str, prefetch: u16) -> Result<Box<dyn Subscription>> {
        let channel = self
            .connection
            .create_channel()
            .await
            .map_err(map_lapin_error)?;
        channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .map_err(map_lapin_error)?;

        let tag = format!("{}-{}", queue, Uuid::new_v4());
        let consumer = channel
            .basic_consume(
                queue,
                &tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(map_lapin_error)?;

        debug!(queue, consumer_tag = %tag, prefetch, "Consumer registered");
        Ok(Box::new(AmqpSubscription {
            channel,
            consumer,
            tag,
            cancelled: false,
        }))
    }

    async fn close(&self) -> Result<()> {
        // The publishing channel may already be closed by a broker-side error
        if let Err(e) = self.publisher.close(REPLY_SUCCESS, "Goodbye").await {
            debug!(error = %e, "Publishing channel already closed");
        }
        self.connection
            .close(REPLY_SUCCESS, "Goodbye")
            .await
            .map_err(map_lapin_error)?;
        info!("Closed connection to RabbitMQ");
        Ok(())
    }
}

struct AmqpSubscription {
    channel: Channel,
    consumer: Consumer,
    tag: String,
    cancelled: bool,
}

#[async_trait]
impl Subscription for AmqpSubscription {
    async fn next_delivery(&mut self) -> Result<Option<Delivery>> {
        if self.cancelled {
            return Ok(None);
        }
        match self.consumer.next().await {
            Some(Ok(mut delivery)) => {
                let payload = std::mem::take(&mut delivery.data);
                let redelivered = delivery.redelivered;
                Ok(Some(Delivery::new(
                    payload,
                    redelivered,
                    Box::new(AmqpAcker { delivery }),
                )))
            }
            Some(Err(e)) => Err(map_lapin_error(e)),
            None => Ok(None),
        }
    }

    async fn cancel(&mut self) -> Result<()> {
        if self.cancelled {
            return Ok(());
        }
        self.cancelled = true;
        self.channel
            .basic_cancel(&self.tag, BasicCancelOptions::default())
            .await
            .map_err(map_lapin_error)?;
        self.channel
            .close(REPLY_SUCCESS, "Subscription cancelled")
            .await
            .map_err(map_lapin_error)
    }
}

struct AmqpAcker {
    delivery: lapin::message::Delivery,
}

#[async_trait]
impl DeliveryAcker for AmqpAcker {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.delivery
            .acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(map_lapin_error)
    }

    async fn reject(self: Box<Self>, requeue: bool) -> Result<()> {
        self.delivery
            .acker
            .reject(BasicRejectOptions { requeue })
            .await
            .map_err(map_lapin_error)
    }
}
