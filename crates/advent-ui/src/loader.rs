use std::path::PathBuf;

use advent_core::ContentDocument;
use crossbeam_channel::{Receiver, Sender};
use tracing::{info, warn};

pub enum LoaderCommand {
    Fetch,
}

pub enum ContentEvent {
    Loaded(ContentDocument),
    Failed(String),
}

pub struct LoaderHandles {
    pub command_sender: Sender<LoaderCommand>,
    pub event_receiver: Receiver<ContentEvent>,
}

/// Spawns the content fetch thread. Each `Fetch` re-reads `path` from disk
/// and wakes the UI with the result.
pub fn spawn_content_loader(path: PathBuf, egui_context: egui::Context) -> LoaderHandles {
    let (command_sender, command_receiver) = crossbeam_channel::unbounded::<LoaderCommand>();
    let (event_sender, event_receiver) = crossbeam_channel::unbounded::<ContentEvent>();

    std::thread::spawn(move || {
        while let Ok(command) = command_receiver.recv() {
            match command {
                LoaderCommand::Fetch => {
                    let event = match ContentDocument::load(&path) {
                        Ok(document) => ContentEvent::Loaded(document),
                        Err(err) => {
                            warn!("loader: {err}");
                            ContentEvent::Failed(err.to_string())
                        }
                    };
                    if event_sender.send(event).is_err() {
                        break;
                    }
                    egui_context.request_repaint();
                }
            }
        }
        info!("loader: command channel closed, exiting");
    });

    LoaderHandles {
        command_sender,
        event_receiver,
    }
}
