use anyhow::{bail, Context, Result};
use cardwise_catalog::{parse_purchases_csv, summarize, CardCatalog, MccDirectory};
use cardwise_core::{now_in, parse_eval_time, recommend, Channel, Mcc, Purchase};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, warn};

mod config;
mod render;
mod state;
mod telemetry;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "cardwise", version, about = "Pick the best credit card for a purchase")]
struct Cli {
    /// Directory of card JSON files (overrides config and the built-in catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank your cards for one purchase
    Recommend {
        /// Merchant category code, e.g. 5812
        #[arg(long, required_unless_present = "search", conflicts_with = "search")]
        mcc: Option<Mcc>,

        /// Pick the category by searching the directory; the query doubles as merchant text
        #[arg(long)]
        search: Option<String>,

        /// Purchase amount in dollars
        #[arg(long)]
        amount: f64,

        /// online | contactless | offline
        #[arg(long, default_value = "offline")]
        channel: String,

        /// Merchant name, for partner-merchant bonuses
        #[arg(long)]
        merchant: Option<String>,

        /// Evaluate as of this time (default: now in the configured timezone)
        #[arg(long)]
        at: Option<String>,

        /// Comma-separated card ids (default: your selected cards)
        #[arg(long, value_delimiter = ',')]
        cards: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// List cards in the catalog (* marks your selection)
    Cards {
        #[arg(long)]
        json: bool,
    },

    /// Choose the cards you hold
    Select {
        #[arg(required_unless_present = "all")]
        ids: Vec<String>,

        /// Use every card in the catalog
        #[arg(long, conflicts_with = "ids")]
        all: bool,
    },

    /// Per-card settings: wrapper pairing and bonus category
    Configure {
        card_id: String,

        #[arg(long, value_enum)]
        wrapper: Option<Toggle>,

        /// Category option id for cards with a selectable bonus category
        #[arg(long)]
        category: Option<String>,
    },

    /// Search merchant categories by name, tag or code
    Mcc {
        #[arg(required = true)]
        query: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Rank cards for every purchase in a CSV (date,merchant,mcc,channel,amount)
    Batch {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_config()?;
    telemetry::init(&cfg.log_level)?;

    match cli.command {
        Command::Recommend {
            mcc,
            search,
            amount,
            channel,
            merchant,
            at,
            cards,
            json,
        } => {
            let catalog = load_catalog(cli.catalog.as_ref(), &cfg)?;
            let amount = validate_amount(amount)?;
            let channel: Channel = channel.parse()?;
            let at = eval_time(at.as_deref(), &cfg.timezone)?;
            let directory = MccDirectory::builtin()?;

            let (mcc, merchant) = match (mcc, search) {
                (Some(mcc), _) => (mcc, merchant),
                (None, Some(query)) => {
                    let (mcc, query) = mcc_from_search(&directory, &query)?;
                    (mcc, merchant.or(Some(query)))
                }
                (None, None) => bail!("pass --mcc or --search"),
            };

            let mut purchase = Purchase::new(mcc, channel, amount, at);
            if let Some(m) = merchant {
                purchase = purchase.with_merchant(m);
            }

            let selected = selected_cards(&catalog, &cards, &cfg.selected_cards);
            debug!(mcc, amount, %channel, cards = selected.len(), "recommending");
            let rec = recommend(
                catalog.cards(),
                &selected,
                &purchase,
                &cfg.card_configs(),
                &cfg.wrapper,
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&rec)?);
            } else {
                print!("{}", render::recommendation(&rec, &purchase, &directory.describe(mcc)));
            }
        }

        Command::Cards { json } => {
            let catalog = load_catalog(cli.catalog.as_ref(), &cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(catalog.cards())?);
            } else {
                let selected = selected_cards(&catalog, &[], &cfg.selected_cards);
                print!(
                    "{}",
                    render::card_list(catalog.cards(), &selected, &cfg.card_configs, &cfg.wrapper)
                );
            }
        }

        Command::Select { ids, all } => {
            let catalog = load_catalog(cli.catalog.as_ref(), &cfg)?;
            if all {
                cfg.selected_cards.clear();
            } else {
                for id in &ids {
                    if !catalog.contains(id) {
                        bail!("unknown card id '{id}' (see `cardwise cards`)");
                    }
                }
                cfg.selected_cards = ids;
            }
            config::save_config(&cfg)?;
            if cfg.selected_cards.is_empty() {
                println!("Selected all {} cards", catalog.len());
            } else {
                println!("Selected: {}", cfg.selected_cards.join(", "));
            }
        }

        Command::Configure {
            card_id,
            wrapper,
            category,
        } => {
            let catalog = load_catalog(cli.catalog.as_ref(), &cfg)?;
            configure_card(&catalog, &mut cfg, &card_id, wrapper, category)?;
            config::save_config(&cfg)?;
            let c = &cfg.card_configs[&card_id];
            println!(
                "{card_id}: wrapper={} category={}",
                if c.wrapper { "on" } else { "off" },
                c.category.as_deref().unwrap_or("default")
            );
        }

        Command::Mcc { query, json } => {
            let directory = MccDirectory::builtin()?;
            let entries = directory.search(&query.join(" "));
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print!("{}", render::mcc_entries(&entries));
            }
        }

        Command::Batch { csv, json } => {
            if !csv.exists() {
                bail!("CSV not found: {} (pass --csv <path>)", csv.display());
            }
            let catalog = load_catalog(cli.catalog.as_ref(), &cfg)?;
            let purchases = parse_purchases_csv(&csv)?;
            let selected = selected_cards(&catalog, &[], &cfg.selected_cards);
            let report = summarize(
                catalog.cards(),
                &selected,
                &purchases,
                &cfg.card_configs(),
                &cfg.wrapper,
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Ranked {} purchases from {}\n", purchases.len(), csv.display());
                print!("{}", render::statement(&report));
            }
        }
    }

    Ok(())
}

fn load_catalog(flag: Option<&PathBuf>, cfg: &Config) -> Result<CardCatalog> {
    match flag.or(cfg.catalog_dir.as_ref()) {
        Some(dir) => CardCatalog::from_dir(dir)
            .with_context(|| format!("loading catalog from {}", dir.display())),
        None => CardCatalog::builtin(),
    }
}

/// Top directory hit for `query`, and the trimmed query to use as merchant text.
fn mcc_from_search(directory: &MccDirectory, query: &str) -> Result<(Mcc, String)> {
    let query = query.trim();
    let Some(entry) = directory.search(query).into_iter().next() else {
        bail!("no merchant category matches '{query}' (try `cardwise mcc <query>`)");
    };
    debug!(query, mcc = entry.mcc, name = %entry.name, "picked category from search");
    Ok((entry.mcc, query.to_string()))
}

fn validate_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("amount must be a positive number, got {amount}");
    }
    Ok(amount)
}

fn eval_time(at: Option<&str>, timezone: &str) -> Result<NaiveDateTime> {
    match at {
        Some(s) => parse_eval_time(s),
        None => now_in(timezone),
    }
}

/// Explicit ids win, then the configured selection, then the whole catalog.
/// Ids the catalog does not know are dropped with a warning.
fn selected_cards(catalog: &CardCatalog, requested: &[String], configured: &[String]) -> Vec<String> {
    let ids: Vec<String> = if !requested.is_empty() {
        requested.to_vec()
    } else if !configured.is_empty() {
        configured.to_vec()
    } else {
        return catalog.ids().map(str::to_string).collect();
    };

    ids.into_iter()
        .filter(|id| {
            let known = catalog.contains(id);
            if !known {
                warn!(card_id = %id, "unknown card id, skipping");
            }
            known
        })
        .collect()
}

fn configure_card(
    catalog: &CardCatalog,
    cfg: &mut Config,
    card_id: &str,
    wrapper: Option<Toggle>,
    category: Option<String>,
) -> Result<()> {
    let Some(card) = catalog.get(card_id) else {
        bail!("unknown card id '{card_id}' (see `cardwise cards`)");
    };

    if wrapper == Some(Toggle::On) && !cfg.wrapper.is_compatible(card_id) {
        bail!(
            "{card_id} cannot be paired with the wrapper (compatible: {})",
            cfg.wrapper.compatible_cards.join(", ")
        );
    }
    if let Some(choice) = &category {
        let Some(options) = &card.configurable_category else {
            bail!("{card_id} has no selectable bonus category");
        };
        if options.option(choice).is_none() {
            let ids: Vec<&str> = options.options.iter().map(|o| o.id.as_str()).collect();
            bail!("unknown category '{choice}' for {card_id} (options: {})", ids.join(", "));
        }
    }

    let entry = cfg.card_config_mut(card_id);
    if let Some(toggle) = wrapper {
        entry.wrapper = toggle == Toggle::On;
    }
    if category.is_some() {
        entry.category = category;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> CardCatalog {
        CardCatalog::builtin().unwrap()
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(12.5).unwrap(), 12.5);
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(-3.0).is_err());
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn test_eval_time_prefers_explicit() {
        let t = eval_time(Some("2025-06-01 08:15"), "Asia/Singapore").unwrap();
        assert_eq!(t.format("%Y-%m-%d %H:%M").to_string(), "2025-06-01 08:15");
        assert!(eval_time(None, "Not/AZone").is_err());
    }

    #[test]
    fn test_selection_precedence() {
        let catalog = builtin();
        let configured = vec!["dbs_yuu".to_string()];

        let all = selected_cards(&catalog, &[], &[]);
        assert_eq!(all.len(), catalog.len());

        assert_eq!(selected_cards(&catalog, &[], &configured), vec!["dbs_yuu"]);

        let requested = vec!["uob_ladys".to_string(), "no_such_card".to_string()];
        assert_eq!(selected_cards(&catalog, &requested, &configured), vec!["uob_ladys"]);
    }

    #[test]
    fn test_configure_wrapper_and_category() {
        let catalog = builtin();
        let mut cfg = Config::default();

        configure_card(&catalog, &mut cfg, "citi_rewards", Some(Toggle::On), None).unwrap();
        configure_card(&catalog, &mut cfg, "uob_ladys", None, Some("transport".into())).unwrap();
        assert!(cfg.card_configs["citi_rewards"].wrapper);
        assert_eq!(cfg.card_configs["uob_ladys"].category.as_deref(), Some("transport"));

        configure_card(&catalog, &mut cfg, "citi_rewards", Some(Toggle::Off), None).unwrap();
        assert!(!cfg.card_configs["citi_rewards"].wrapper);
    }

    #[test]
    fn test_configure_rejects_bad_input() {
        let catalog = builtin();
        let mut cfg = Config::default();

        assert!(configure_card(&catalog, &mut cfg, "nope", Some(Toggle::On), None).is_err());
        assert!(configure_card(&catalog, &mut cfg, "dbs_yuu", Some(Toggle::On), None).is_err());
        assert!(configure_card(&catalog, &mut cfg, "dbs_yuu", None, Some("dining".into())).is_err());
        assert!(configure_card(&catalog, &mut cfg, "uob_ladys", None, Some("pets".into())).is_err());
        assert!(cfg.card_configs.is_empty());
    }

    #[test]
    fn test_cli_parses_recommend() {
        let cli = Cli::try_parse_from([
            "cardwise", "recommend", "--mcc", "5812", "--amount", "42.5", "--channel", "online",
            "--cards", "citi_rewards,uob_ladys",
        ])
        .unwrap();
        match cli.command {
            Command::Recommend { mcc, amount, channel, cards, json, .. } => {
                assert_eq!(mcc, Some(5812));
                assert_eq!(amount, 42.5);
                assert_eq!(channel, "online");
                assert_eq!(cards, vec!["citi_rewards", "uob_ladys"]);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_recommend_needs_mcc_or_search() {
        let base = ["cardwise", "recommend", "--amount", "10"];
        assert!(Cli::try_parse_from(base).is_err());
        assert!(Cli::try_parse_from(base.iter().chain(&["--search", "giant"])).is_ok());
        assert!(Cli::try_parse_from(base.iter().chain(&["--mcc", "5411", "--search", "giant"])).is_err());
    }

    #[test]
    fn test_search_picks_category_and_keeps_query_as_merchant() {
        let directory = MccDirectory::builtin().unwrap();

        let (mcc, merchant) = mcc_from_search(&directory, " 5812 ").unwrap();
        assert_eq!(mcc, 5812);
        assert_eq!(merchant, "5812");

        let (mcc, merchant) = mcc_from_search(&directory, "shopee").unwrap();
        assert_eq!(mcc, 5999);
        assert_eq!(merchant, "shopee");

        assert!(mcc_from_search(&directory, "zzzz no such place").is_err());
    }

    #[test]
    fn test_cli_select_all_conflicts_with_ids() {
        assert!(Cli::try_parse_from(["cardwise", "select", "--all", "dbs_yuu"]).is_err());
        assert!(Cli::try_parse_from(["cardwise", "select"]).is_err());
        assert!(Cli::try_parse_from(["cardwise", "select", "--all"]).is_ok());
    }
}
