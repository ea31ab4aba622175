use crate::Flavor;
use crate::ident::{quote_ident, quote_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexType {
    #[default]
    BTree,
    Hash,
    FullText,
    Spatial,
}

/// One key part: either a column reference (by name, so column and index
/// lifetimes stay independent) or a functional-index expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexPartBase {
    Column(String),
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPart {
    pub base: IndexPartBase,
    pub sub_part: Option<u32>,
    pub descending: bool,
}

impl IndexPart {
    pub fn column(name: impl Into<String>) -> Self {
        Self {
            base: IndexPartBase::Column(name.into()),
            sub_part: None,
            descending: false,
        }
    }

    fn definition(&self) -> String {
        let mut def = match &self.base {
            IndexPartBase::Column(name) => quote_ident(name),
            IndexPartBase::Expression(expr) => format!("({expr})"),
        };
        if let Some(sub_part) = self.sub_part {
            def.push_str(&format!("({sub_part})"));
        }
        if self.descending {
            def.push_str(" DESC");
        }
        def
    }

    pub fn references_column(&self, column_name: &str) -> bool {
        match &self.base {
            IndexPartBase::Column(name) => name == column_name,
            IndexPartBase::Expression(expr) => expr.contains(&quote_ident(column_name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub parts: Vec<IndexPart>,
    pub primary_key: bool,
    pub unique: bool,
    pub index_type: IndexType,
    pub invisible: bool,
    pub fulltext_parser: Option<String>,
    pub comment: Option<String>,
}

impl Index {
    /// A primary key that is not unique means the introspector mis-read the
    /// server, so construction fails loudly rather than producing a model
    /// that would generate wrong DDL.
    pub fn new(name: impl Into<String>, parts: Vec<IndexPart>, primary_key: bool, unique: bool) -> Self {
        assert!(
            !primary_key || unique,
            "primary key index must be unique; introspection produced an invalid index"
        );
        Self {
            name: name.into(),
            parts,
            primary_key,
            unique,
            index_type: IndexType::default(),
            invisible: false,
            fulltext_parser: None,
            comment: None,
        }
    }

    pub fn primary(parts: Vec<IndexPart>) -> Self {
        Self::new("PRIMARY", parts, true, true)
    }

    /// One line of a CREATE TABLE body for this index.
    pub fn definition(&self, flavor: &Flavor) -> String {
        assert!(
            !self.primary_key || self.unique,
            "primary key index must be unique; introspection produced an invalid index"
        );

        let parts = self
            .parts
            .iter()
            .map(IndexPart::definition)
            .collect::<Vec<_>>()
            .join(",");

        let mut def = if self.primary_key {
            format!("PRIMARY KEY ({parts})")
        } else {
            let keyword = match self.index_type {
                IndexType::FullText => "FULLTEXT KEY",
                IndexType::Spatial => "SPATIAL KEY",
                _ if self.unique => "UNIQUE KEY",
                _ => "KEY",
            };
            format!("{keyword} {} ({parts})", quote_ident(&self.name))
        };

        if self.index_type == IndexType::Hash {
            def.push_str(" USING HASH");
        }

        if let Some(parser) = &self.fulltext_parser {
            def.push_str(&format!(" /*!50100 WITH PARSER {} */", quote_ident(parser)));
        }

        if self.invisible {
            if flavor.is_mariadb() {
                def.push_str(" INVISIBLE");
            } else {
                def.push_str(" /*!80000 INVISIBLE */");
            }
        }

        if let Some(comment) = &self.comment {
            def.push_str(&format!(" COMMENT {}", quote_value(comment)));
        }

        def
    }

    pub fn references_column(&self, column_name: &str) -> bool {
        self.parts
            .iter()
            .any(|part| part.references_column(column_name))
    }

    /// Definition equality ignoring the index name, for rename detection.
    pub fn equivalent_modulo_name(&self, other: &Index, flavor: &Flavor) -> bool {
        let mut renamed = other.clone();
        renamed.name = self.name.clone();
        self.definition(flavor) == renamed.definition(flavor)
    }
}
