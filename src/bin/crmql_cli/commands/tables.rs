use anyhow::Result;

use crate::context::Context;

/// Affiche le nombre de lignes de chaque table
pub fn execute(context: &mut Context) -> Result<()> {
    let tables = context.tables()?;

    let formatted = context.formatter().format_tables(&tables)?;
    println!("{}", formatted);

    Ok(())
}
