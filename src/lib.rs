//! Usage Ceiling - adaptive ceiling estimation and burn rate analytics

pub mod cli;
pub mod usage;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the fmt subscriber for the binaries.
///
/// Log lines go to stderr; stdout carries only the report. `RUST_LOG`
/// wins over the default level; records emitted through `log` are
/// forwarded by the subscriber's log bridge.
pub fn init_logging(debug: bool) {
    log_subscriber(debug, std::io::stderr).init();
}

fn log_subscriber<W>(debug: bool, writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let default = if debug {
        "usage_ceiling_lib=debug,usage_ceiling=debug"
    } else {
        "usage_ceiling_lib=info,usage_ceiling=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(writer),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_lines_go_to_the_given_writer() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = log_subscriber(false, move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("ccusage unavailable");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("ccusage unavailable"));
    }
}
