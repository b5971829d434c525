//! Line-oriented note intake.
//!
//! Each non-empty line read from the input becomes one note. The gateway
//! stops at end of input or when shutdown is requested.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use gitnotes_core::notesaving::SaveError;
use gitnotes_core::{NoteAdder, NoteSaver, ShutdownSignal};

/// Counters reported when the gateway exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySummary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Feed lines from `input` into `saver` until EOF or shutdown.
pub async fn run_gateway<R, A>(
    input: R,
    saver: &NoteSaver<A>,
    mut shutdown: ShutdownSignal,
) -> std::io::Result<GatewaySummary>
where
    R: AsyncBufRead + Unpin,
    A: NoteAdder,
{
    let mut lines = input.lines();
    let mut summary = GatewaySummary::default();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.wait_for(|stop| *stop) => {
                debug!("gateway interrupted by shutdown");
                break;
            }
        };
        let Some(line) = line else {
            info!("end of input");
            break;
        };

        match saver.save(&line) {
            Ok(_) => summary.saved += 1,
            Err(SaveError::EmptyNote) => summary.skipped += 1,
            Err(e) => {
                warn!(error = %e, "failed to save note");
                summary.failed += 1;
            }
        }
    }

    info!(
        saved = summary.saved,
        skipped = summary.skipped,
        failed = summary.failed,
        "gateway stopped"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use gitnotes_core::errors::WriteError;
    use gitnotes_core::shutdown_channel;

    #[derive(Default)]
    struct Collect {
        texts: Mutex<Vec<String>>,
    }

    impl NoteAdder for Collect {
        fn add(&self, title: &str, text: &str) -> Result<PathBuf, WriteError> {
            if text == "boom" {
                return Err(WriteError::InvalidTitle(title.to_string()));
            }
            self.texts.lock().unwrap().push(text.to_string());
            Ok(PathBuf::from(format!("{title}.md")))
        }
    }

    #[tokio::test]
    async fn test_one_note_per_nonempty_line() {
        let saver = NoteSaver::new(Collect::default());
        let (_trigger, signal) = shutdown_channel();
        let input: &[u8] = b"first\n\n   \nsecond line\nboom\nthird";

        let summary = run_gateway(input, &saver, signal).await.unwrap();

        assert_eq!(summary, GatewaySummary { saved: 3, skipped: 2, failed: 1 });
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let saver = NoteSaver::new(Collect::default());
        let (trigger, signal) = shutdown_channel();
        // Never yields a line.
        let (_writer, reader) = tokio::io::duplex(64);
        let reader = tokio::io::BufReader::new(reader);

        trigger.trigger();
        let summary = run_gateway(reader, &saver, signal).await.unwrap();
        assert_eq!(summary, GatewaySummary::default());
    }
}
