//! One client run: transcript on `out`, exit status as the result

use anyhow::Result;
use eodlink_core::config::ClientConfig;
use eodlink_core::protocol::{Connector, Handshake};
use std::io::Write;

use crate::report;

/// Handshake completed
pub const EXIT_SUCCESS: u8 = 0;
/// Anything failed
pub const EXIT_FAILURE: u8 = 1;

/// Run the handshake through `connector`, printing progress as it happens
pub fn execute<C: Connector, W: Write>(connector: C, config: &ClientConfig, out: &mut W) -> u8 {
    let _ = writeln!(out, "client start");
    match handshake(connector, config, out) {
        Ok(()) => {
            let _ = writeln!(out, "client end");
            EXIT_SUCCESS
        }
        Err(e) => fail(out, &e),
    }
}

/// Report `error` the way every failed run ends
pub fn fail<W: Write>(out: &mut W, error: &anyhow::Error) -> u8 {
    let _ = writeln!(out, "{}", report::failure(error));
    let _ = out.flush();
    EXIT_FAILURE
}

fn handshake<C: Connector, W: Write>(
    connector: C,
    config: &ClientConfig,
    out: &mut W,
) -> Result<()> {
    let mut handshake = Handshake::new(
        connector,
        config.candidates(),
        config.session_options(),
        config.script()?,
    );

    // Reads block without a timeout, so lines go out as soon as they are true
    handshake.run_with(|event| {
        if let Some(text) = report::event(&event) {
            let _ = writeln!(out, "{}", text);
            let _ = out.flush();
        }
    })?;
    Ok(())
}
