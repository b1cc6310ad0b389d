use anyhow::Result;
use crmql::Value;

use crate::context::Context;

/// Lit un paramètre comme un scalaire JSON, sinon comme une chaîne
pub fn parse_param(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json @ (serde_json::Value::Null
        | serde_json::Value::Bool(_)
        | serde_json::Value::Number(_)
        | serde_json::Value::String(_))) => Value::from(json),
        _ => Value::from(raw),
    }
}

pub fn parse_params<S: AsRef<str>>(raw: &[S]) -> Vec<Value> {
    raw.iter().map(|p| parse_param(p.as_ref())).collect()
}

fn is_read(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}

/// Exécute une instruction et affiche le résultat
pub fn execute(context: &mut Context, sql: &str, params: &[Value]) -> Result<()> {
    let rows = context.execute(sql, params)?;

    if is_read(sql) {
        let formatted = context.formatter().format_rows(&rows)?;
        println!("{}", formatted);
        if context.verbosity() > 0 {
            println!("{}", context.formatter().format_info(&format!("{} ligne(s)", rows.len())));
        }
    } else {
        println!("{}", context.formatter().format_success("Instruction exécutée"));
    }

    Ok(())
}
