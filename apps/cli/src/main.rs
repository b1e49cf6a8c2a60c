#![deny(warnings)]

//! Headless CLI over the planner: inspect material needs and edit the goal
//! and depot ledgers of a local state file.

use anyhow::{bail, Context, Result};
use persistence::{JsonFileStore, PersistConfig, Session};
use planner_core::{
    craft_plan, required_materials, Expansion, ItemId, OperatorGoal, OperatorGoalType,
    CURRENCY_ITEM_ID,
};
use planner_state::Action;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Optional YAML config; flags take precedence.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
struct Config {
    catalog: Option<PathBuf>,
    state: Option<PathBuf>,
    debounce_ms: Option<u64>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Needed { recursive: bool },
    Goals,
    Add(Vec<OperatorGoal>),
    Delete(OperatorGoal),
    Complete(OperatorGoal),
    Focus(OperatorGoal),
    Move { from: usize, to: usize },
    Owned { item: ItemId, quantity: i64 },
    Craft(ItemId),
    ToggleCraft(ItemId),
    Reset,
    ClearGoals,
}

#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    state: Option<PathBuf>,
    command: Command,
}

const USAGE: &str = "usage: planner [--config FILE] [--catalog FILE] [--state FILE] <command>
commands:
  needed [--recursive]          materials needed for all goals
  goals                         list goals in order
  add <operatorId> <goal>...    add goals (goal = 0..16)
  delete <operatorId> <goal>
  complete <operatorId> <goal>  debit the goal's cost and remove it
  focus <operatorId> <goal>     toggle focus
  move <from> <to>              reorder goals
  owned <itemId> <quantity>     set owned quantity
  craft <itemId>                craft one unit from owned materials
  toggle-craft <itemId>         toggle crafting expansion for an item
  reset                         clear the depot
  clear-goals                   remove every goal";

fn parse_goal(op: &str, goal: &str) -> Result<OperatorGoal> {
    let n: u8 = goal.parse().with_context(|| format!("goal must be 0..16, got {goal}"))?;
    Ok(OperatorGoal::new(op, OperatorGoalType::try_from(n)?))
}

fn parse_command(words: &[String]) -> Result<Command> {
    let strs: Vec<&str> = words.iter().map(String::as_str).collect();
    let cmd = match strs.as_slice() {
        ["needed"] => Command::Needed { recursive: false },
        ["needed", "--recursive"] => Command::Needed { recursive: true },
        ["goals"] => Command::Goals,
        ["add", op, goals @ ..] if !goals.is_empty() => Command::Add(
            goals
                .iter()
                .map(|g| parse_goal(op, g))
                .collect::<Result<_>>()?,
        ),
        ["delete", op, g] => Command::Delete(parse_goal(op, g)?),
        ["complete", op, g] => Command::Complete(parse_goal(op, g)?),
        ["focus", op, g] => Command::Focus(parse_goal(op, g)?),
        ["move", from, to] => Command::Move {
            from: from.parse().context("invalid index")?,
            to: to.parse().context("invalid index")?,
        },
        ["owned", item, q] => Command::Owned {
            item: ItemId::from(*item),
            quantity: q.parse().context("invalid quantity")?,
        },
        ["craft", item] => Command::Craft(ItemId::from(*item)),
        ["toggle-craft", item] => Command::ToggleCraft(ItemId::from(*item)),
        ["reset"] => Command::Reset,
        ["clear-goals"] => Command::ClearGoals,
        _ => bail!("{USAGE}"),
    };
    Ok(cmd)
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut config = None;
    let mut catalog = None;
    let mut state = None;
    let mut rest = Vec::new();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => config = it.next().map(PathBuf::from),
            "--catalog" => catalog = it.next().map(PathBuf::from),
            "--state" => state = it.next().map(PathBuf::from),
            _ => rest.push(arg),
        }
    }
    Ok(Args {
        config,
        catalog,
        state,
        command: parse_command(&rest)?,
    })
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading config {}", p.display()))?;
            Ok(serde_yaml::from_str(&text).context("parsing config")?)
        }
        None => Ok(Config::default()),
    }
}

fn print_needed(session: &Session, recursive: bool) -> Result<()> {
    let planner = session.planner();
    let expansion = if recursive {
        Expansion::Recursive
    } else {
        Expansion::SingleLevel
    };
    let needed = planner.needed(expansion)?;
    let owned = planner.depot().quantities();
    let catalog = planner.catalog();

    let currency = ItemId::from(CURRENCY_ITEM_ID);
    if let Some(n) = needed.get(&currency) {
        println!("LMD: {} / {}", planner.depot().quantity(&currency), n);
    }
    for status in required_materials(&needed, owned, catalog)? {
        let item = catalog.item(&status.item_id)?;
        let mark = if status.complete { "x" } else { " " };
        println!(
            "[{mark}] T{} {} ({}): {} / {}",
            item.tier, item.name, status.item_id, status.owned, status.needed
        );
    }
    let plan = craft_plan(&needed, owned, planner.depot().items_being_crafted(), catalog)?;
    for (id, count) in &plan.craftable {
        println!("can craft {count}x {id}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(args.config.as_ref())?;
    let catalog_path = args
        .catalog
        .or(config.catalog)
        .unwrap_or_else(|| PathBuf::from("assets/catalog.json"));
    let state_path = args
        .state
        .or(config.state)
        .unwrap_or_else(|| PathBuf::from("saves/planner.json"));
    let persist = PersistConfig {
        debounce: config
            .debounce_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| PersistConfig::default().debounce),
    };
    info!(catalog = %catalog_path.display(), state = %state_path.display(), "starting CLI");

    let catalog = Arc::new(data_pipeline::load_catalog(&catalog_path)?);
    let mut session = Session::open(catalog, JsonFileStore::new(&state_path), persist)?;

    match args.command {
        Command::Needed { recursive } => print_needed(&session, recursive)?,
        Command::Goals => {
            for (i, g) in session.planner().goals().iter().enumerate() {
                let name = &session.planner().catalog().operator(&g.operator_id)?.name;
                let star = if g.focused { "*" } else { " " };
                println!("{i:>3}{star} {name}: {}", g.goal);
            }
        }
        Command::Add(goals) => session.dispatch(Action::AddGoals(goals))?,
        Command::Delete(g) => session.dispatch(Action::DeleteGoal(g))?,
        Command::Complete(g) => {
            if !session.complete_goal(&g)? {
                println!("goal not found: {} {}", g.operator_id, g.goal);
            }
        }
        Command::Focus(g) => session.dispatch(Action::ToggleFocus(g))?,
        Command::Move { from, to } => session.dispatch(Action::ReorderGoal {
            old_index: from,
            new_index: to,
        })?,
        Command::Owned { item, quantity } => session.dispatch(Action::SetItemQuantity {
            item_id: item,
            quantity,
        })?,
        Command::Craft(item) => session.craft_item(&item)?,
        Command::ToggleCraft(item) => session.dispatch(Action::ToggleItemCrafting(item))?,
        Command::Reset => session.dispatch(Action::ResetDepot)?,
        Command::ClearGoals => session.dispatch(Action::ClearGoals)?,
    }

    let stats = session.close().await?;
    if stats.failed > 0 {
        bail!("failed to save state to {}", state_path.display());
    }
    Ok(())
}
