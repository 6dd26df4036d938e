use crate::console::ConsoleInteraction;
use dbnav_core::{
    DispatchContext, DispatchOutcome, ExpandOutcome, MoveOutcome, MoveTarget, Navigator, Node,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

const HELP: &str = "\
Commands:
  tree                      print the tree
  load                      reload folders and connections
  expand <id>               expand a node
  collapse <id>             collapse a node
  refresh <id>              re-resolve a node's children
  menu <id>                 list the node's actions
  run <handler> <id>        run an action
  open <id>                 run the node's primary action
  move <id> <parent|/>      move a folder or connection
  mkdir <name> [parent]     create a folder
  rename <id> <name>        rename a folder
  quit";

enum Command<'a> {
    Tree,
    Load,
    Expand(&'a str),
    Collapse(&'a str),
    Refresh(&'a str),
    Menu(&'a str),
    Run { handler: &'a str, id: &'a str },
    Open(&'a str),
    Move { id: &'a str, target: MoveTarget },
    Mkdir { name: &'a str, parent: Option<&'a str> },
    Rename { id: &'a str, name: String },
    Help,
    Quit,
}

fn parse(line: &str) -> Result<Command<'_>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words[..] {
        ["tree"] => Command::Tree,
        ["load"] => Command::Load,
        ["expand", id] => Command::Expand(id),
        ["collapse", id] => Command::Collapse(id),
        ["refresh", id] => Command::Refresh(id),
        ["menu", id] => Command::Menu(id),
        ["run", handler, id] => Command::Run { handler, id },
        ["open", id] => Command::Open(id),
        ["move", id, "/"] => Command::Move {
            id,
            target: MoveTarget::Root,
        },
        ["move", id, parent] => Command::Move {
            id,
            target: MoveTarget::Parent(parent.to_string()),
        },
        ["mkdir", name] => Command::Mkdir { name, parent: None },
        ["mkdir", name, parent] => Command::Mkdir {
            name,
            parent: Some(parent),
        },
        ["rename", id, ref name @ ..] if !name.is_empty() => Command::Rename {
            id,
            name: name.join(" "),
        },
        ["help"] | ["?"] => Command::Help,
        ["quit"] | ["exit"] => Command::Quit,
        _ => return Err(format!("Unrecognized command: {}", line.trim())),
    };
    Ok(command)
}

pub async fn run(navigator: &Navigator) -> anyhow::Result<()> {
    let ui = ConsoleInteraction;

    match navigator.config.load_forest().await {
        Ok(count) => println!("Loaded {} root nodes", count),
        Err(e) => println!("[error] Could not load the tree: {}", e),
    }

    let stdin = io::stdin();
    loop {
        print!("dbnav> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse(&line) {
            Ok(Command::Quit) => return Ok(()),
            Ok(command) => execute(navigator, &ui, command).await,
            Err(message) => println!("{}\n{}", message, HELP),
        }
    }
}

async fn execute(navigator: &Navigator, ui: &ConsoleInteraction, command: Command<'_>) {
    match command {
        Command::Tree => print_forest(&navigator.cache.snapshot()),
        Command::Load => match navigator.config.load_forest().await {
            Ok(count) => println!("Loaded {} root nodes", count),
            Err(e) => println!("[error] {}", e),
        },
        Command::Expand(id) => report_expand(navigator.expansion.expand(id, ui).await),
        Command::Collapse(id) => report_expand(navigator.expansion.collapse(id)),
        Command::Refresh(id) => report_expand(navigator.expansion.refresh(id, ui).await),
        Command::Menu(id) => {
            let Some(node) = find(navigator, id) else { return };
            let menu = navigator.dispatcher.list_actions(&node).await;
            let primary = menu.primary().map(|item| item.handler.clone());
            for entry in &menu.entries {
                match entry.as_action() {
                    Some(item) => {
                        let star = if primary.as_deref() == Some(item.handler.as_str()) {
                            "*"
                        } else {
                            " "
                        };
                        println!("{} {:<28} {}", star, item.handler, item.label);
                    }
                    None => println!("  ----"),
                }
            }
        }
        Command::Run { handler, id } => {
            let Some(node) = find(navigator, id) else { return };
            report_dispatch(
                navigator
                    .dispatcher
                    .dispatch(handler, &node, &DispatchContext::new(ui))
                    .await,
            );
        }
        Command::Open(id) => {
            let Some(node) = find(navigator, id) else { return };
            match navigator.dispatcher.primary_action(&node).await {
                Some(item) => report_dispatch(
                    navigator
                        .dispatcher
                        .dispatch(&item.handler, &node, &DispatchContext::new(ui))
                        .await,
                ),
                None => println!("{} has no actions", id),
            }
        }
        Command::Move { id, target } => {
            let hint = navigator.cache.find_node(id).map(|n| n.node_type.to_string());
            match navigator.moves.move_node(id, target, hint.as_deref(), ui).await {
                MoveOutcome::Moved => {}
                MoveOutcome::Cancelled => println!("Cancelled"),
                MoveOutcome::Failed(_) => {}
            }
        }
        Command::Mkdir { name, parent } => {
            if let Err(e) = navigator
                .config
                .create_folder(name, parent.map(str::to_string))
                .await
            {
                println!("[error] {}", e);
            }
        }
        Command::Rename { id, name } => {
            if let Err(e) = navigator.config.rename_folder(id, &name).await {
                println!("[error] {}", e);
            }
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn find(navigator: &Navigator, id: &str) -> Option<Arc<Node>> {
    let node = navigator.cache.find_node(id);
    if node.is_none() {
        println!("No node {}", id);
    }
    node
}

fn report_expand(outcome: ExpandOutcome) {
    match outcome {
        ExpandOutcome::NotFound => println!("No such node"),
        ExpandOutcome::NeedsConnection => println!("Connect first: run connectAndExpand <id>"),
        _ => {}
    }
}

fn report_dispatch(outcome: DispatchOutcome) {
    if outcome == DispatchOutcome::Cancelled {
        println!("Cancelled");
    }
}

fn print_forest(nodes: &[Arc<Node>]) {
    if nodes.is_empty() {
        println!("(empty)");
    }
    for node in nodes {
        print_node(node, 0);
    }
}

fn print_node(node: &Node, depth: usize) {
    let marker = match (node.expanded, node.is_expandable()) {
        (true, _) => "-",
        (false, true) => "+",
        (false, false) => " ",
    };
    let online = if node.is_connection() && node.connected {
        " (connected)"
    } else {
        ""
    };
    println!(
        "{}{} {} [{}]{}  {}",
        "  ".repeat(depth),
        marker,
        node.name,
        node.effective_type(),
        online,
        node.id
    );

    if node.expanded {
        for child in node.child_nodes() {
            print_node(child, depth + 1);
        }
    }
}
