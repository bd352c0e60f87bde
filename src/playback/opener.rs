use std::process::{Child, Command};
use std::thread;

use anyhow::{bail, Context, Result};

/// Opens a link outside the app (browser, music service).
pub trait LinkOpener: Send + Sync {
    fn open(&self, uri: &str) -> Result<()>;
}

/// Hands web links to the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl LinkOpener for SystemOpener {
    fn open(&self, uri: &str) -> Result<()> {
        if !(uri.starts_with("https://") || uri.starts_with("http://")) {
            bail!("refusing to open non-web link {uri}");
        }

        #[cfg(target_os = "macos")]
        let mut command = {
            let mut c = Command::new("open");
            c.arg(uri);
            c
        };

        #[cfg(target_os = "windows")]
        let mut command = {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", "", uri]);
            c
        };

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let mut command = {
            let mut c = Command::new("xdg-open");
            c.arg(uri);
            c
        };

        let child = command
            .spawn()
            .with_context(|| format!("failed to launch opener for {uri}"))?;
        reap(child)
    }
}

/// Waits for the launcher off the caller's thread so it never lingers as a
/// zombie. The handler it starts (the browser) outlives it.
fn reap(mut child: Child) -> Result<()> {
    thread::Builder::new()
        .name("link-opener".to_string())
        .spawn(move || match child.wait() {
            Ok(status) if !status.success() => log::warn!("link opener exited with {status}"),
            Ok(_) => {}
            Err(err) => log::warn!("failed to wait for link opener: {err}"),
        })
        .context("failed to start link opener reaper")?;
    Ok(())
}
