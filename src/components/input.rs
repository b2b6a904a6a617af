//! Console Input
//!
//! Front panel events arrive over an unbounded channel. Producers are a stdin
//! line reader and the Ctrl-C handler; the pipeline drains the channel without
//! ever waiting on it.

use crate::{api::peripherals::InputEvents, core::events::InputToken};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

#[derive(Debug)]
pub struct ChannelInput {
    rx: UnboundedReceiver<InputToken>,
}

impl ChannelInput {
    pub fn new(rx: UnboundedReceiver<InputToken>) -> Self {
        Self { rx }
    }

    /// Creates an input together with the sender that feeds it.
    pub fn channel() -> (UnboundedSender<InputToken>, Self) {
        let (tx, rx) = unbounded_channel();
        (tx, Self::new(rx))
    }
}

impl InputEvents for ChannelInput {
    fn try_next(&mut self) -> Option<InputToken> {
        self.rx.try_recv().ok()
    }
}

/// Forwards parsed stdin lines until stdin closes or the receiver is gone.
pub fn spawn_stdin_reader(tx: UnboundedSender<InputToken>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match InputToken::parse(&line) {
                    Some(token) => {
                        debug!("input: {:?}", token);
                        if tx.send(token).is_err() {
                            break;
                        }
                    }
                    None => warn!("unknown command {:?}", line.trim()),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    })
}

/// Turns every Ctrl-C into a stop token.
pub fn spawn_ctrl_c_handler(tx: UnboundedSender<InputToken>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            if tx.send(InputToken::Stop).is_err() {
                break;
            }
        }
    })
}
