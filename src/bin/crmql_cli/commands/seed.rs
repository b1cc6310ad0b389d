use anyhow::Result;
use crmql::seed::seed_demo_data;

use crate::context::Context;

/// Insère le jeu de données de démonstration
pub fn execute(context: &mut Context) -> Result<()> {
    let database = context.database_mut("seed")?;
    let report = seed_demo_data(database)?;
    database.flush()?;

    let message = if report.skipped {
        "Données de démonstration déjà présentes".to_string()
    } else {
        format!("{} lignes insérées: {}", report.total(), report)
    };
    println!("{}", context.formatter().format_success(&message));

    Ok(())
}
