use crate::ident::{quote_ident, quote_qualified};

/// Foreign key constraint. Rules hold the server's spelling (`CASCADE`,
/// `SET NULL`, ...) with the empty string standing for `RESTRICT`, which
/// `SHOW CREATE TABLE` elides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    /// Empty when the referenced table lives in the same schema.
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    pub update_rule: String,
    pub delete_rule: String,
}

impl ForeignKey {
    /// One line of a CREATE TABLE body for this constraint.
    pub fn definition(&self) -> String {
        let columns = quote_name_list(&self.columns);
        let referenced_columns = quote_name_list(&self.referenced_columns);
        let mut def = format!(
            "CONSTRAINT {} FOREIGN KEY ({columns}) REFERENCES {} ({referenced_columns})",
            quote_ident(&self.name),
            quote_qualified(&self.referenced_schema, &self.referenced_table),
        );
        if !self.delete_rule.is_empty() {
            def.push_str(&format!(" ON DELETE {}", self.delete_rule));
        }
        if !self.update_rule.is_empty() {
            def.push_str(&format!(" ON UPDATE {}", self.update_rule));
        }
        def
    }

    /// Definition equality ignoring the constraint name. A foreign key that
    /// only changed names is cosmetic and suppressed by default diffs.
    pub fn equivalent_modulo_name(&self, other: &ForeignKey) -> bool {
        self.columns == other.columns
            && self.referenced_schema == other.referenced_schema
            && self.referenced_table == other.referenced_table
            && self.referenced_columns == other.referenced_columns
            && self.update_rule == other.update_rule
            && self.delete_rule == other.delete_rule
    }
}

fn quote_name_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}
