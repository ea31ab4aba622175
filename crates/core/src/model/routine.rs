use crate::ident::quote_ident;

use super::{ObjectKey, ObjectType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineType {
    Procedure,
    Function,
}

impl RoutineType {
    pub fn keyword(self) -> &'static str {
        match self {
            RoutineType::Procedure => "PROCEDURE",
            RoutineType::Function => "FUNCTION",
        }
    }

    pub fn object_type(self) -> ObjectType {
        match self {
            RoutineType::Procedure => ObjectType::Procedure,
            RoutineType::Function => ObjectType::Function,
        }
    }
}

/// Stored procedure or function. The server offers no ALTER that can change
/// a body, so routines diff as drop-and-recreate; equality therefore spans
/// every field here, including the sql_mode captured at definition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routine {
    pub routine_type: RoutineType,
    pub name: String,
    /// `user@host` form; empty to omit the DEFINER clause.
    pub definer: String,
    pub param_string: String,
    /// Functions only.
    pub return_type: Option<String>,
    pub body: String,
    pub characteristics: Vec<String>,
    /// Session sql_mode in effect when the routine was defined.
    pub sql_mode: String,
    /// sql_mode to set when recreating the routine.
    pub creation_sql_mode: String,
    pub database_collation: String,
}

impl Routine {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.routine_type.object_type(), self.name.clone())
    }

    pub fn definition(&self) -> String {
        let mut def = String::from("CREATE ");
        if !self.definer.is_empty() {
            def.push_str(&format!("DEFINER={} ", render_definer(&self.definer)));
        }
        def.push_str(&format!(
            "{} {}({})",
            self.routine_type.keyword(),
            quote_ident(&self.name),
            self.param_string
        ));
        if let Some(return_type) = &self.return_type {
            def.push_str(&format!(" RETURNS {return_type}"));
        }
        for characteristic in &self.characteristics {
            def.push_str("\n    ");
            def.push_str(characteristic);
        }
        def.push('\n');
        def.push_str(&self.body);
        def
    }

    pub fn drop_statement(&self) -> String {
        format!(
            "DROP {} IF EXISTS {}",
            self.routine_type.keyword(),
            quote_ident(&self.name)
        )
    }
}

fn render_definer(definer: &str) -> String {
    match definer.rsplit_once('@') {
        Some((user, host)) => format!("{}@{}", quote_ident(user), quote_ident(host)),
        None => quote_ident(definer),
    }
}
