use crate::Flavor;
use crate::ident::{quote_ident, quote_value};

use super::Table;

/// Column default, as reported by `SHOW CREATE TABLE`. The `quoted` flag on
/// literals records whether the server prints the value inside quotes; that
/// varies by flavor (MariaDB 10.2+ prints bare numerics, MySQL quotes them)
/// and must survive round-tripping for byte-equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDefault {
    None,
    Null,
    Literal { value: String, quoted: bool },
    Expression(String),
}

impl ColumnDefault {
    pub fn literal(value: impl Into<String>) -> Self {
        ColumnDefault::Literal {
            value: value.into(),
            quoted: true,
        }
    }

    fn clause(&self, flavor: &Flavor) -> Option<String> {
        match self {
            ColumnDefault::None => None,
            ColumnDefault::Null => Some("DEFAULT NULL".to_string()),
            ColumnDefault::Literal { value, quoted } => Some(if *quoted {
                format!("DEFAULT {}", quote_value(value))
            } else {
                format!("DEFAULT {value}")
            }),
            ColumnDefault::Expression(expr) => Some(render_default_expression(expr, flavor)),
        }
    }
}

fn render_default_expression(expr: &str, flavor: &Flavor) -> String {
    let lowered = expr.to_ascii_lowercase();
    if lowered.starts_with("current_timestamp") {
        if flavor.is_mariadb() && (flavor.major, flavor.minor) >= (10, 2) {
            let rendered = if lowered.contains('(') {
                lowered
            } else {
                format!("{lowered}()")
            };
            return format!("DEFAULT {rendered}");
        }
        return format!("DEFAULT {expr}");
    }

    if flavor.is_mysql_family() && flavor.expression_defaults() && !expr.starts_with('(') {
        return format!("DEFAULT ({expr})");
    }
    format!("DEFAULT {expr}")
}

/// Generated-column clause. `stored` distinguishes `STORED` from `VIRTUAL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub expr: String,
    pub stored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Type exactly as the server emits it, e.g. `int unsigned` or
    /// `varchar(30)`.
    pub type_in_db: String,
    pub nullable: bool,
    pub auto_increment: bool,
    pub default: ColumnDefault,
    pub on_update: Option<String>,
    /// Set only for textual types.
    pub char_set: Option<String>,
    pub collation: Option<String>,
    /// Whether `collation` is its character set's default collation, which
    /// controls whether the server prints a COLLATE clause.
    pub collation_is_default: bool,
    pub comment: Option<String>,
    pub invisible: bool,
    pub compression: Option<String>,
    pub generation: Option<Generation>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_in_db: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_in_db: type_in_db.into(),
            nullable: true,
            auto_increment: false,
            default: ColumnDefault::Null,
            on_update: None,
            char_set: None,
            collation: None,
            collation_is_default: true,
            comment: None,
            invisible: false,
            compression: None,
            generation: None,
        }
    }

    /// Type as rendered for the given flavor. MySQL 8.0.19+ drops integer
    /// display widths, except `tinyint(1)` which is kept as the boolean
    /// convention marker.
    pub fn rendered_type(&self, flavor: &Flavor) -> String {
        if !flavor.omit_int_display_width() {
            return self.type_in_db.clone();
        }
        strip_int_display_width(&self.type_in_db)
    }

    /// One line of a CREATE TABLE body, matching the server's own output
    /// for this flavor. `table` supplies the surrounding defaults that
    /// decide whether charset/collation clauses appear.
    pub fn definition(&self, flavor: &Flavor, table: &Table) -> String {
        let mut def = format!("{} {}", quote_ident(&self.name), self.rendered_type(flavor));

        if let Some(char_set) = &self.char_set {
            if char_set != &table.char_set {
                def.push_str(&format!(" CHARACTER SET {char_set}"));
            }
            if let Some(collation) = &self.collation
                && !self.collation_is_default
            {
                def.push_str(&format!(" COLLATE {collation}"));
            }
        }

        if let Some(compression) = &self.compression {
            if flavor.is_mariadb() {
                def.push_str(&format!(" /*!100301 {compression}*/"));
            } else {
                def.push_str(&format!(" COLUMN_FORMAT {compression}"));
            }
        }

        if let Some(generation) = &self.generation {
            let kind = if generation.stored { "STORED" } else { "VIRTUAL" };
            def.push_str(&format!(
                " GENERATED ALWAYS AS ({}) {kind}",
                generation.expr
            ));
        }

        if !self.nullable {
            def.push_str(" NOT NULL");
        } else if self.type_in_db.starts_with("timestamp") {
            // timestamps are NOT NULL by default, so the server spells out
            // the nullable case
            def.push_str(" NULL");
        }

        if self.auto_increment {
            def.push_str(" AUTO_INCREMENT");
        }

        if self.invisible && flavor.is_mariadb() {
            def.push_str(" INVISIBLE");
        }

        if self.generation.is_none()
            && let Some(default) = self.default.clause(flavor)
        {
            def.push(' ');
            def.push_str(&default);
        }

        if let Some(on_update) = &self.on_update {
            def.push_str(&format!(" ON UPDATE {on_update}"));
        }

        if self.invisible && !flavor.is_mariadb() {
            def.push_str(" /*!80023 INVISIBLE */");
        }

        if let Some(comment) = &self.comment {
            def.push_str(&format!(" COMMENT {}", quote_value(comment)));
        }

        def
    }

    /// Whether changing this column's type to `other`'s can lose data.
    pub fn type_narrows_to(&self, other: &Column) -> bool {
        crate::diff::type_narrows(&self.type_in_db, &other.type_in_db)
    }
}

fn strip_int_display_width(type_in_db: &str) -> String {
    const INT_PREFIXES: [&str; 5] = ["bigint", "mediumint", "smallint", "tinyint", "int"];
    for prefix in INT_PREFIXES {
        if let Some(rest) = type_in_db.strip_prefix(prefix)
            && rest.starts_with('(')
            && let Some(close) = rest.find(')')
            && rest[1..close].bytes().all(|b| b.is_ascii_digit())
        {
            if prefix == "tinyint" && &rest[1..close] == "1" {
                return type_in_db.to_string();
            }
            return format!("{prefix}{}", &rest[close + 1..]);
        }
    }
    type_in_db.to_string()
}
