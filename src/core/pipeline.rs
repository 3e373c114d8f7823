//! Read pipeline: raw transport read, word-order normalization, decode.
//!
//! Every outcome is folded into a [`ReadResult`]; nothing escapes as an error.

use std::time::Instant;

use crate::codec::convert_words;
use crate::core::data::{ReadResult, Value};
use crate::core::error::Result;
use crate::core::lifecycle::Connection;
use crate::core::logging::ErrorContext;
use crate::core::point::{DataType, RegisterAddress};
use crate::core::traits::{RawValue, Transport};

/// Message of a read attempted without a live connection.
pub const CONNECTION_FAILED: &str = "connection failed";

/// Turn a raw transport value into a typed value.
pub fn decode_raw(raw: RawValue, data_type: DataType) -> Result<Value> {
    match raw {
        RawValue::Words(words) => convert_words(&words, data_type),
        RawValue::Scalar(value) => Ok(value),
    }
}

/// Read a single point through `conn`.
///
/// `resolve` maps the configured address to the one handed to the transport;
/// an address it rejects fails the read before any I/O, as does an
/// unsupported data type. A failed read leaves the connection state untouched.
/// Every call reports one `ReadOperation` event.
pub async fn read_point<T, F>(
    conn: &mut Connection<T>,
    address: &RegisterAddress,
    resolve: F,
) -> ReadResult
where
    T: Transport,
    F: FnOnce(&str) -> Result<String> + Send,
{
    let started = Instant::now();
    let result = read_inner(conn, address, resolve).await;

    if !result.is_good() {
        tracing::debug!(
            device_id = %conn.log().device_id(),
            address = %address.address,
            reason = result.message(),
            "Point read failed"
        );
    }
    conn.log()
        .log_read(
            address.address.clone(),
            &result,
            started.elapsed().as_millis() as u64,
        )
        .await;
    result
}

async fn read_inner<T, F>(
    conn: &mut Connection<T>,
    address: &RegisterAddress,
    resolve: F,
) -> ReadResult
where
    T: Transport,
    F: FnOnce(&str) -> Result<String> + Send,
{
    if !conn.is_connected() {
        return ReadResult::bad(CONNECTION_FAILED);
    }

    let target = match resolve(&address.address) {
        Ok(target) => target,
        Err(e) => {
            conn.log().log_error(e.to_string(), ErrorContext::Address).await;
            return ReadResult::bad(e.to_string());
        }
    };
    if let Err(e) = address.data_type.validate() {
        conn.log()
            .log_error(e.to_string(), ErrorContext::Conversion)
            .await;
        return ReadResult::bad(e.to_string());
    }

    let raw = match conn.read_raw(&target, address.word_count()).await {
        Ok(raw) => raw,
        Err(e) => {
            let message = format!("read failed: {}", e);
            conn.log().log_error(message.clone(), ErrorContext::Read).await;
            return ReadResult::bad(message);
        }
    };

    match decode_raw(raw, address.data_type) {
        Ok(value) => ReadResult::good(value),
        Err(e) => {
            conn.log()
                .log_error(e.to_string(), ErrorContext::Conversion)
                .await;
            ReadResult::bad(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging::LogContext;
    use crate::core::point::{ValueKind, WordOrder};
    use crate::protocols::simulated::SimulatedTransport;
    use crate::core::error::GatewayError;
    use crate::core::logging::{DriverLogConfig, DriverLogEvent, DriverLogHandler};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use uuid::Uuid;

    fn as_is(address: &str) -> Result<String> {
        Ok(address.to_string())
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DriverLogHandler for Recorder {
        async fn on_log(&self, _device_id: Uuid, event: DriverLogEvent) {
            let label = match event {
                DriverLogEvent::Error { context, .. } => format!("Error({})", context),
                other => format!("{:?}", other.event_type()),
            };
            self.events.lock().unwrap().push(label);
        }
    }

    async fn connected(sim: SimulatedTransport) -> Connection<SimulatedTransport> {
        let mut conn = Connection::new(
            sim,
            Duration::from_millis(200),
            LogContext::new(Uuid::new_v4()),
        );
        assert!(conn.connect().await);
        conn
    }

    #[tokio::test]
    async fn test_read_not_connected() {
        let mut conn = Connection::new(
            SimulatedTransport::new("sim:102"),
            Duration::from_millis(200),
            LogContext::new(Uuid::new_v4()),
        );
        let result = read_point(
            &mut conn,
            &RegisterAddress::new("DB1.DBW0", DataType::default()),
            as_is,
        )
        .await;

        assert!(!result.is_good());
        assert_eq!(result.message(), CONNECTION_FAILED);
        assert!(result.value.is_null());
    }

    #[tokio::test]
    async fn test_read_float_with_default_order() {
        let sim = SimulatedTransport::new("sim:102");
        // 42.0f32 = 0x4228_0000, stored CDAB
        sim.handle().set_words("DB1.DBD0", vec![0x0000, 0x4228]);
        let mut conn = connected(sim).await;

        let address = RegisterAddress::new("DB1.DBD0", DataType::of(ValueKind::Float32));
        let result = read_point(&mut conn, &address, as_is).await;

        assert!(result.is_good());
        assert_eq!(result.value.as_f64(), Some(42.0));
    }

    #[tokio::test]
    async fn test_read_failure_keeps_connection() {
        let sim = SimulatedTransport::new("sim:102");
        let handle = sim.handle();
        let mut conn = connected(sim).await;

        handle.fail_read("checksum mismatch");
        let address = RegisterAddress::new("DB1.DBW0", DataType::of(ValueKind::Int16));
        let result = read_point(&mut conn, &address, as_is).await;

        assert!(!result.is_good());
        assert!(result.message().contains("checksum mismatch"));
        assert!(conn.is_connected());
    }

    #[tokio::test]
    async fn test_invalid_data_type_skips_io() {
        let sim = SimulatedTransport::new("sim:102");
        let handle = sim.handle();
        let mut conn = connected(sim).await;

        let address = RegisterAddress::new(
            "DB1.DBW0",
            DataType::new(ValueKind::Int16, WordOrder::V3),
        );
        let result = read_point(&mut conn, &address, as_is).await;

        assert!(!result.is_good());
        assert!(result.message().contains("Invalid data type"));
        assert_eq!(handle.read_count(), 0);
    }

    #[test]
    fn test_decode_raw_scalar_passes_through() {
        let value = decode_raw(RawValue::Scalar(Value::Bool(true)), DataType::of(ValueKind::Bool));
        assert_eq!(value, Ok(Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_resolved_address_reaches_transport() {
        let sim = SimulatedTransport::new("sim:502");
        sim.handle().set_words("1:100", vec![0x0007]);
        let mut conn = connected(sim).await;

        let address = RegisterAddress::new("100", DataType::of(ValueKind::UInt16));
        let result = read_point(&mut conn, &address, |a| Ok(format!("1:{}", a))).await;

        assert_eq!(result.value.as_i64(), Some(7));
    }

    #[tokio::test]
    async fn test_every_read_is_logged() {
        let sim = SimulatedTransport::new("sim:102");
        let handle = sim.handle();
        let mut conn = connected(sim).await;
        let recorder = Arc::new(Recorder::default());
        conn.log_mut().set_handler(recorder.clone());
        conn.log_mut().set_config(DriverLogConfig::all());

        let address = RegisterAddress::new("DB1.DBW0", DataType::of(ValueKind::Int16));
        let rejected = read_point(&mut conn, &address, |a| {
            Err(GatewayError::Config(format!("bad address {}", a)))
        })
        .await;
        assert!(rejected.message().contains("bad address DB1.DBW0"));

        let undefined = RegisterAddress::new(
            "DB1.DBW0",
            DataType::new(ValueKind::Int16, WordOrder::V3),
        );
        read_point(&mut conn, &undefined, as_is).await;

        conn.close().await;
        recorder.events.lock().unwrap().clear();
        read_point(&mut conn, &address, as_is).await;
        let after_close = recorder.events.lock().unwrap().clone();

        assert_eq!(after_close, vec!["ReadOperation"]);
        assert_eq!(handle.read_count(), 0);
    }

    #[tokio::test]
    async fn test_rejections_log_error_context() {
        let sim = SimulatedTransport::new("sim:102");
        let mut conn = connected(sim).await;
        let recorder = Arc::new(Recorder::default());
        conn.log_mut().set_handler(recorder.clone());
        conn.log_mut().set_config(DriverLogConfig::all());

        let address = RegisterAddress::new("DB1.DBW0", DataType::of(ValueKind::Int16));
        read_point(&mut conn, &address, |_| {
            Err(GatewayError::Config("bad address".into()))
        })
        .await;
        let undefined = RegisterAddress::new(
            "DB1.DBW0",
            DataType::new(ValueKind::Int16, WordOrder::V3),
        );
        read_point(&mut conn, &undefined, as_is).await;

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "Error(address)",
                "ReadOperation",
                "Error(conversion)",
                "ReadOperation"
            ]
        );
    }
}
