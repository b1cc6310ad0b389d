mod history;

use std::path::Path;

use anyhow::Result;
use crmql::DatabaseConfig;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use self::history::HistoryLog;
use crate::commands;
use crate::context::Context;
use crate::formatters::OutputFormat;
use crate::utils::error::CliError;

const HISTORY_FILE: &str = "crmql_history.txt";

/// Mode interactif (REPL)
pub struct Repl {
    /// Contexte d'exécution
    context: Context,

    /// Configuration des bases ouvertes par `.open`
    config: DatabaseConfig,

    /// Éditeur de ligne
    editor: DefaultEditor,

    /// Historique persisté
    history: HistoryLog,

    running: bool,
}

impl Repl {
    /// Crée un nouveau REPL
    pub fn new(context: Context, config: DatabaseConfig) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;

        // Charger l'historique s'il existe
        let mut history = HistoryLog::new(HISTORY_FILE, 1000);
        if let Err(e) = history.load() {
            log::warn!("Historique illisible: {:#}", e);
        }
        for entry in history.entries() {
            let _ = editor.add_history_entry(entry);
        }

        Ok(Repl {
            context,
            config,
            editor,
            history,
            running: true,
        })
    }

    /// Exécute le REPL puis rend le contexte
    pub fn run(mut self) -> Result<Context> {
        println!("{}", self.context.formatter().format_info("crmql CLI - Mode interactif"));
        println!("{}", self.context.formatter().format_info("Tapez .help pour l'aide ou .exit pour quitter"));

        while self.running {
            let prompt = match self.context.target() {
                Some(target) => format!("crmql [{}]> ", target),
                None => "crmql (déconnecté)> ".to_string(),
            };

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());
                    self.history.record(&line);

                    if let Err(e) = self.process_line(line.trim()) {
                        println!("{}", self.context.formatter().format_error(&e.to_string()));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl-C
                    println!("Interruption (Ctrl-C)");
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl-D
                    println!("Fin de l'entrée (Ctrl-D)");
                    break;
                }
                Err(err) => {
                    println!("{}", self.context.formatter().format_error(&format!("Erreur: {}", err)));
                    break;
                }
            }
        }

        self.history.save()?;
        Ok(self.context)
    }

    /// Traite une ligne entrée par l'utilisateur
    fn process_line(&mut self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }

        if let Some(cmd) = line.strip_prefix('.') {
            return self.process_special_command(cmd);
        }

        let params = self.context.bindings().to_vec();
        commands::exec::execute(&mut self.context, line, &params)
    }

    /// Traite les commandes spéciales (commençant par '.')
    fn process_special_command(&mut self, cmd: &str) -> Result<()> {
        let parts: Vec<&str> = cmd.split_whitespace().collect();

        match parts.as_slice() {
            ["help"] => self.print_help(),
            ["exit"] | ["quit"] => {
                println!("Au revoir !");
                self.running = false;
            }
            ["connect", url] => commands::connect::execute(&mut self.context, url)?,
            ["open", path] => {
                commands::connect::open(&mut self.context, Path::new(path), self.config.clone())?;
                println!("{}", self.context.formatter().format_success(&format!("Base ouverte: {}", path)));
            }
            ["tables"] => commands::tables::execute(&mut self.context)?,
            ["seed"] => commands::seed::execute(&mut self.context)?,
            ["bind", params @ ..] => {
                let bindings = commands::exec::parse_params(params);
                let message = if bindings.is_empty() {
                    "Paramètres effacés".to_string()
                } else {
                    let shown: Vec<String> = bindings.iter().map(ToString::to_string).collect();
                    format!("Paramètres liés: {}", shown.join(", "))
                };
                self.context.set_bindings(bindings);
                println!("{}", self.context.formatter().format_success(&message));
            }
            ["format", name] => {
                let format = match *name {
                    "text" => OutputFormat::Text,
                    "json" => OutputFormat::Json,
                    "table" => OutputFormat::Table,
                    _ => {
                        println!("{}", self.context.formatter().format_error("Format inconnu"));
                        return Ok(());
                    }
                };
                self.context.set_format(format);
                println!("{}", self.context.formatter().format_success(&format!("Format défini à {}", name)));
            }
            ["history", pattern @ ..] => {
                let commands: Vec<&str> = match pattern.first() {
                    Some(pattern) => self.history.matching(pattern),
                    None => self.history.entries().collect(),
                };

                if commands.is_empty() {
                    println!("Aucune commande dans l'historique.");
                } else {
                    for (i, cmd) in commands.iter().enumerate() {
                        println!("{}: {}", i + 1, cmd);
                    }
                }
            }
            _ => return Err(CliError::UnknownCommand(cmd.to_string()).into()),
        }

        Ok(())
    }

    /// Affiche l'aide
    fn print_help(&self) {
        println!("Commandes disponibles:");
        println!("  .help                     Affiche cette aide");
        println!("  .exit, .quit              Quitte le CLI");
        println!("  .open <fichier>           Ouvre une base locale");
        println!("  .connect <url>            Se connecte à un serveur crmql");
        println!("  .tables                   Nombre de lignes par table");
        println!("  .seed                     Insère les données de démonstration (base locale)");
        println!("  .bind [params...]         Lie les paramètres des instructions suivantes");
        println!("  .format <text|json|table> Définit le format de sortie");
        println!("  .history [motif]          Affiche l'historique des commandes");
        println!();
        println!("Toute autre entrée est exécutée comme une instruction, avec les paramètres liés.");
    }
}
