use async_trait::async_trait;
use dbnav_core::{ConfirmRequest, Interaction, ModalRequest, Node, Notice, NoticeLevel, ViewIntent};
use std::io::{self, BufRead, Write};

/// Prints notices and requests to the terminal; confirmations are y/N prompts.
pub struct ConsoleInteraction;

#[async_trait]
impl Interaction for ConsoleInteraction {
    async fn confirm(&self, request: ConfirmRequest) -> bool {
        let marker = if request.danger { "!" } else { "?" };
        let prompt = format!("[{}] {}: {} [y/N] ", marker, request.title, request.message);

        tokio::task::spawn_blocking(move || ask(&prompt))
            .await
            .unwrap_or(false)
    }

    fn notify(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        println!("[{}] {}", tag, notice.message);
    }

    fn open_modal(&self, request: ModalRequest) {
        let hint = match request {
            ModalRequest::NewConnection { parent_id } => {
                format!("new connection under {}", parent_id.as_deref().unwrap_or("/"))
            }
            ModalRequest::NewFolder { parent_id } => {
                format!("new folder under {} (use `mkdir`)", parent_id.as_deref().unwrap_or("/"))
            }
            ModalRequest::RenameFolder {
                folder_id,
                current_name,
            } => format!("rename {} \"{}\" (use `rename`)", folder_id, current_name),
            ModalRequest::EditConnection { connection_id } => {
                format!("edit connection {}", connection_id)
            }
        };
        println!("[dialog] {}", hint);
    }

    fn open_view(&self, intent: ViewIntent, node: &Node) {
        println!("[view] {:?} for {}", intent, node.id);
    }
}

fn ask(prompt: &str) -> bool {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}
