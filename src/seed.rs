//! Demo data
//!
//! Fills a database with a small CRM dataset through ordinary `INSERT OR
//! IGNORE` statements. Identifiers are random; names, statuses and date
//! offsets follow fixed rotations so every run has the same shape.

use std::fmt;

use chrono::{Duration, SecondsFormat, Utc};
use log::info;
use uuid::Uuid;

use crate::core::document::Record;
use crate::core::errors::Result;
use crate::core::value::Value;
use crate::Database;

const ADMIN_EMAIL: &str = "admin@crm.com";

const USERS: [(&str, &str, &str); 5] = [
    ("Admin User", ADMIN_EMAIL, "admin"),
    ("Manager 1", "manager1@crm.com", "manager"),
    ("Agent 1", "agent1@crm.com", "agent"),
    ("Agent 2", "agent2@crm.com", "agent"),
    ("Agent 3", "agent3@crm.com", "agent"),
];

const ACCOUNTS: [(&str, &str, i64, f64, i64, &str, Option<&str>); 10] = [
    ("Acme Corporation", "technology", 1996, 1100.04, 2822, "United States", None),
    ("Betatech", "medical", 1986, 647.18, 1185, "Kenya", None),
    ("Bluth Company", "technology", 1993, 1242.32, 3027, "United States", Some("Acme Corporation")),
    ("Cheers", "entertainment", 1993, 4269.9, 6472, "United States", Some("Massive Dynamic")),
    ("Globex Corporation", "technology", 2000, 1223.72, 2497, "Norway", None),
    ("Golddex", "finance", 2008, 52.5, 165, "United States", None),
    ("Initech", "telecommunications", 1994, 6395.05, 20275, "United States", None),
    ("Massive Dynamic", "entertainment", 1989, 665.06, 1095, "United States", None),
    ("Umbrella Corporation", "finance", 1998, 2022.14, 5113, "United States", None),
    ("Zotware", "software", 1979, 4478.47, 13809, "United States", None),
];

const LEAD_STATUSES: [&str; 7] = ["New", "Contacted", "Qualified", "Proposal Sent", "Negotiation", "Won", "Lost"];
const PRIORITIES: [&str; 3] = ["Low", "Medium", "High"];
const SOURCES: [&str; 8] = [
    "Website", "LinkedIn", "Referral", "Cold Call", "Google Ads", "Trade Show", "Social Media", "WhatsApp",
];
const COMPANIES: [&str; 12] = [
    "Alpha", "Beta", "Gamma", "Delta", "Epsilon", "Zeta", "Eta", "Theta", "Iota", "Kappa", "Lambda", "Mu",
];

const ACTIVITY_TYPES: [&str; 5] = ["Call", "Email", "Meeting", "Note", "Video Call"];
const OUTCOMES: [&str; 4] = ["Positive", "Neutral", "Interested", "Not Interested"];
const SUBJECTS: [&str; 5] = [
    "Initial discovery call",
    "Follow-up on referral",
    "Sent product brochure",
    "Proposal sent",
    "Demo scheduling call",
];

const TASK_TITLES: [&str; 5] = [
    "Send thank you note",
    "Send revised quotation",
    "Follow up CRM demo",
    "Schedule demo call",
    "Finalize SOW document",
];
const TASK_STATUSES: [&str; 5] = ["Pending", "In Progress", "Completed", "Overdue", "Cancelled"];

const TEMPLATES: [(&str, &str, &str); 3] = [
    ("Welcome Email", "Welcome to Our Services", "Dear {{name}},\n\nThank you for your interest.\n\nBest,\nThe Team"),
    ("Follow-up Email", "Following Up on Our Discussion", "Hi {{name}},\n\nJust following up on our conversation.\n\nBest,\n{{agent}}"),
    ("Proposal Sent", "Proposal for {{company}}", "Dear {{name}},\n\nPlease find our proposal attached.\n\nRegards,\n{{agent}}"),
];

/// Rows inserted per table by a seeding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub accounts: usize,
    pub leads: usize,
    pub activities: usize,
    pub tasks: usize,
    pub email_templates: usize,
    /// The database already held demo data; nothing was inserted
    pub skipped: bool,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.users + self.accounts + self.leads + self.activities + self.tasks + self.email_templates
    }
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return write!(f, "demo data already present, nothing inserted");
        }
        write!(
            f,
            "{} users, {} accounts, {} leads, {} activities, {} tasks, {} email templates",
            self.users, self.accounts, self.leads, self.activities, self.tasks, self.email_templates
        )
    }
}

fn new_id() -> Value {
    Value::from(Uuid::new_v4().to_string())
}

fn days_from_now(days: i64) -> Value {
    Value::from((Utc::now() + Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn id_of(row: &Record) -> Value {
    row.get("id").cloned().unwrap_or(Value::Null)
}

/// Insert the demo dataset, unless the admin user already exists
pub fn seed_demo_data(db: &mut Database) -> Result<SeedReport> {
    let existing = db
        .prepare("SELECT COUNT(*) as n FROM users WHERE email = ?")
        .get(&[Value::from(ADMIN_EMAIL)])?;
    if existing.is_some_and(|row| row.get("n").is_some_and(Value::is_truthy)) {
        info!("Demo data already present, skipping seed");
        return Ok(SeedReport {
            skipped: true,
            ..SeedReport::default()
        });
    }

    let mut report = SeedReport::default();

    let mut insert = db.prepare("INSERT OR IGNORE INTO users (id, name, email, role) VALUES (?, ?, ?, ?)");
    for (name, email, role) in USERS {
        insert.run(&[new_id(), name.into(), email.into(), role.into()])?;
        report.users += 1;
    }

    let mut insert = db.prepare(
        "INSERT OR IGNORE INTO accounts (id, account, sector, year_established, revenue, employees, office_location, subsidiary_of) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    );
    for (account, sector, year, revenue, employees, location, subsidiary) in ACCOUNTS {
        insert.run(&[
            new_id(),
            account.into(),
            sector.into(),
            year.into(),
            revenue.into(),
            employees.into(),
            location.into(),
            subsidiary.into(),
        ])?;
        report.accounts += 1;
    }

    let users = db.prepare("SELECT * FROM users ORDER BY created_at").all(&[])?;
    let admin = users
        .iter()
        .find(|u| u.get("email").is_some_and(|e| e.as_text() == ADMIN_EMAIL))
        .map(id_of)
        .unwrap_or(Value::Null);
    let agents: Vec<Value> = users
        .iter()
        .filter(|u| u.get("role").is_some_and(|r| r.as_text() != "admin"))
        .map(id_of)
        .collect();
    let agent = |i: usize| agents.get(i % agents.len().max(1)).cloned().unwrap_or_else(|| admin.clone());

    let mut lead_ids = Vec::new();
    let mut insert = db.prepare(
        "INSERT OR IGNORE INTO leads (id, name, email, phone, company, source, status, priority, estimated_value, \
         currency, assigned_to, follow_up, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    );
    for (i, company) in COMPANIES.iter().enumerate() {
        let id = new_id();
        let n = i + 1;
        let created = days_from_now(-(i as i64) * 9);
        insert.run(&[
            id.clone(),
            format!("Customer {}", n).into(),
            format!("customer{}@example.com", n).into(),
            format!("92000000{:04}", 100 + n).into(),
            format!("Company {}", company).into(),
            SOURCES[i % SOURCES.len()].into(),
            LEAD_STATUSES[i % LEAD_STATUSES.len()].into(),
            PRIORITIES[i % PRIORITIES.len()].into(),
            (50_000 + (n as i64 * 37_500) % 900_000).into(),
            Value::from(if i < 10 { "PKR" } else { "USD" }),
            agent(i),
            days_from_now((i % 7) as i64 + 1),
            created.clone(),
            created,
        ])?;
        lead_ids.push(id);
        report.leads += 1;
    }

    let mut insert = db.prepare(
        "INSERT OR IGNORE INTO activities (id, lead_id, type, subject, outcome, duration, performed_by, date) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    );
    for (i, lead_id) in lead_ids.iter().take(8).enumerate() {
        let duration = [None, Some(15), Some(25), Some(35), Some(45)][i % 5];
        insert.run(&[
            new_id(),
            lead_id.clone(),
            ACTIVITY_TYPES[i % ACTIVITY_TYPES.len()].into(),
            SUBJECTS[i % SUBJECTS.len()].into(),
            OUTCOMES[i % OUTCOMES.len()].into(),
            duration.into(),
            agent(i),
            days_from_now(-(i as i64) * 2),
        ])?;
        report.activities += 1;
    }

    let mut insert = db.prepare(
        "INSERT OR IGNORE INTO tasks (id, lead_id, title, status, priority, due_date, assigned_to) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    );
    for (i, lead_id) in lead_ids.iter().enumerate() {
        let due = if i % 3 == 0 { -2 } else { i as i64 };
        insert.run(&[
            new_id(),
            lead_id.clone(),
            TASK_TITLES[i % TASK_TITLES.len()].into(),
            TASK_STATUSES[i % TASK_STATUSES.len()].into(),
            PRIORITIES[i % PRIORITIES.len()].into(),
            days_from_now(due),
            agent(i),
        ])?;
        report.tasks += 1;
    }

    let mut insert = db.prepare(
        "INSERT OR IGNORE INTO email_templates (id, name, subject, body, created_by) VALUES (?, ?, ?, ?, ?)",
    );
    for (name, subject, body) in TEMPLATES {
        insert.run(&[new_id(), name.into(), subject.into(), body.into(), admin.clone()])?;
        report.email_templates += 1;
    }

    info!("Seeded {}", report);
    Ok(report)
}
