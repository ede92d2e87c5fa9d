//! Progress logging for the job.
//!
//! Events go to stdout unless stdout carries the JSON report, in which case
//! they go to stderr. Colour is only used when the chosen stream is a
//! terminal.

use std::io::{self, IsTerminal as _};

use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt::MakeWriter, util::SubscriberInitExt as _};

/// Where progress events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
  Stdout,
  Stderr,
}

impl LogStream {
  /// Stderr when stdout is reserved for the report.
  pub fn for_report(json_on_stdout: bool) -> Self {
    if json_on_stdout { Self::Stderr } else { Self::Stdout }
  }

  fn is_terminal(self) -> bool {
    match self {
      Self::Stdout => io::stdout().is_terminal(),
      Self::Stderr => io::stderr().is_terminal(),
    }
  }
}

/// An INFO-by-default subscriber (`RUST_LOG` overrides) writing to `writer`.
pub fn subscriber<W>(writer: W, ansi: bool) -> impl Subscriber + Send + Sync + 'static
where
  W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(writer)
    .with_ansi(ansi)
    .finish()
}

/// Install the global subscriber for `stream`.
pub fn init(stream: LogStream) {
  let ansi = stream.is_terminal();
  match stream {
    LogStream::Stdout => subscriber(io::stdout, ansi).init(),
    LogStream::Stderr => subscriber(io::stderr, ansi).init(),
  }
}

#[cfg(test)]
pub(crate) mod capture {
  use std::{
    io,
    sync::{Arc, Mutex},
  };

  /// In-memory log sink for tests.
  #[derive(Clone, Default)]
  pub struct Captured(Arc<Mutex<Vec<u8>>>);

  impl Captured {
    pub fn text(&self) -> String {
      String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
  }

  impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
      self.0.lock().unwrap().extend_from_slice(buf);
      Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
  }
}
