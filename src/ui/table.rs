use tabled::{settings::Style, Table, Tabled};
use crate::business::BusinessSymptomRecord;
use crate::storage::DbStats;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Businesses", &stats.businesses.to_string());
    builder.add_row("Symptoms", &stats.symptoms.to_string());
    builder.add_row("Business symptoms", &stats.business_symptoms.to_string());
    builder.add_row("Schema version", &stats.schema_version.to_string());
    builder.build()
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Business ID")]
    business_id: i64,
    #[tabled(rename = "Business")]
    business_name: String,
    #[tabled(rename = "Symptom Code")]
    symptom_code: String,
    #[tabled(rename = "Symptom")]
    symptom_name: String,
    #[tabled(rename = "Diagnostic")]
    diagnostic: String,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

/// Render query results; the diagnostic column is pre-rendered by the caller's `flag` style
pub fn records_table(records: &[BusinessSymptomRecord], flag: impl Fn(bool) -> String) -> String {
    if records.is_empty() {
        return String::new();
    }

    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            business_id: r.business_id,
            business_name: r.business_name.clone(),
            symptom_code: r.symptom_code.clone(),
            symptom_name: r.symptom_name.clone(),
            diagnostic: flag(r.diagnostic),
            updated_at: r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}
