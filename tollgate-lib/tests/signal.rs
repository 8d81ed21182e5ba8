use std::time::Duration;

use tollgate_lib::lifecycle::{OsSignals, ShutdownSignal};

// Kept in its own test binary: the signal goes to the whole process.
#[tokio::test]
async fn test_sigint_maps_to_interrupt() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let signals = OsSignals::register()?;
    let received = tokio::spawn(signals.recv());

    // SAFETY: raise only delivers a signal to this process, whose SIGINT
    // disposition was replaced by the handler registered above.
    let rc = unsafe { libc::raise(libc::SIGINT) };
    assert_eq!(rc, 0);

    let signal = tokio::time::timeout(Duration::from_secs(2), received).await??;
    assert_eq!(signal, ShutdownSignal::Interrupt);
    Ok(())
}
