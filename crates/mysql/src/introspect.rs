use std::collections::BTreeMap;

use mysql::{PooledConn, prelude::Queryable};
use tracing::debug;

use driftql_core::{
    Column, ColumnDefault, Flavor, ForeignKey, Generation, Index, IndexPart, IndexPartBase,
    IndexType, Routine, RoutineType, Schema, Table,
};

use crate::error::InstanceError;
use crate::fixups;

/// Populates a full [`Schema`] from information_schema plus per-object
/// `SHOW CREATE`, applying the fixups that make the regenerated CREATE
/// byte-match the server's own.
pub(crate) fn introspect_schema(
    conn: &mut PooledConn,
    flavor: &Flavor,
    schema_name: &str,
) -> Result<Schema, InstanceError> {
    debug!(schema = schema_name, %flavor, "introspecting schema");

    let mut schema = Schema::named(schema_name);
    let (char_set, collation) = schema_attributes(conn, schema_name)?;
    schema.char_set = char_set;
    schema.collation = collation;

    let default_collations = default_collations(conn)?;

    for summary in table_summaries(conn, schema_name)? {
        let table = introspect_table(conn, flavor, schema_name, &summary, &default_collations)?;
        schema.tables.push(table);
    }
    schema.routines = introspect_routines(conn, flavor, schema_name)?;

    Ok(schema)
}

fn schema_attributes(
    conn: &mut PooledConn,
    schema_name: &str,
) -> Result<(String, String), InstanceError> {
    let sql = format!(
        "SELECT DEFAULT_CHARACTER_SET_NAME, DEFAULT_COLLATION_NAME \
         FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = {}",
        sql_string(schema_name)
    );
    conn.query_first::<(String, String), _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?
        .ok_or_else(|| InstanceError::unexpected(&sql, "schema not found"))
}

/// Collation name -> whether it is its character set's default.
fn default_collations(conn: &mut PooledConn) -> Result<BTreeMap<String, bool>, InstanceError> {
    let sql = "SELECT COLLATION_NAME, IS_DEFAULT FROM information_schema.COLLATIONS";
    let rows = conn
        .query::<(String, Option<String>), _>(sql)
        .map_err(|source| InstanceError::query(sql, source))?;
    Ok(rows
        .into_iter()
        .map(|(name, is_default)| (name, is_default.as_deref() == Some("Yes")))
        .collect())
}

struct TableSummary {
    name: String,
    engine: String,
    collation: Option<String>,
    create_options: String,
    next_auto_increment: u64,
    comment: String,
}

fn table_summaries(
    conn: &mut PooledConn,
    schema_name: &str,
) -> Result<Vec<TableSummary>, InstanceError> {
    let sql = format!(
        "SELECT TABLE_NAME, ENGINE, TABLE_COLLATION, CREATE_OPTIONS, AUTO_INCREMENT, \
         TABLE_COMMENT \
         FROM information_schema.TABLES \
         WHERE TABLE_SCHEMA = {} AND TABLE_TYPE = 'BASE TABLE' \
         ORDER BY TABLE_NAME",
        sql_string(schema_name)
    );
    type Row = (
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<u64>,
        Option<String>,
    );
    let rows = conn
        .query::<Row, _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?;

    Ok(rows
        .into_iter()
        .map(
            |(name, engine, collation, create_options, auto_increment, comment)| TableSummary {
                name,
                engine: engine.unwrap_or_default(),
                collation,
                create_options: normalize_create_options(create_options.as_deref().unwrap_or("")),
                next_auto_increment: auto_increment.unwrap_or(0),
                comment: comment.unwrap_or_default(),
            },
        )
        .collect())
}

/// information_schema reports `partitioned` as a pseudo-option; the real
/// partitioning clause is modeled separately.
fn normalize_create_options(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|token| !token.eq_ignore_ascii_case("partitioned"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn introspect_table(
    conn: &mut PooledConn,
    flavor: &Flavor,
    schema_name: &str,
    summary: &TableSummary,
    default_collations: &BTreeMap<String, bool>,
) -> Result<Table, InstanceError> {
    let create_statement = show_create_table(conn, schema_name, &summary.name)?;

    let mut table = Table::named(&summary.name);
    table.engine = summary.engine.clone();
    table.create_options = summary.create_options.clone();
    table.next_auto_increment = summary.next_auto_increment;
    table.comment = summary.comment.clone();
    table.partitioning = extract_partitioning(&create_statement);
    table.create_statement = create_statement;

    if let Some(collation) = &summary.collation {
        table.collation = collation.clone();
        table.char_set = char_set_of_collation(collation);
        table.collation_is_default = default_collations.get(collation).copied().unwrap_or(false);
    }

    table.columns = introspect_columns(conn, flavor, schema_name, summary, default_collations)?;
    let (primary_key, secondary_indexes) = introspect_indexes(conn, flavor, schema_name, &summary.name)?;
    table.primary_key = primary_key;
    table.secondary_indexes = secondary_indexes;
    table.foreign_keys = introspect_foreign_keys(conn, schema_name, &summary.name)?;

    fixups::apply(&mut table, flavor);
    Ok(table)
}

fn show_create_table(
    conn: &mut PooledConn,
    schema_name: &str,
    table_name: &str,
) -> Result<String, InstanceError> {
    let sql = format!(
        "SHOW CREATE TABLE {}",
        driftql_core::ident::quote_qualified(schema_name, table_name)
    );
    let row = conn
        .query_first::<(String, String), _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?
        .ok_or_else(|| InstanceError::unexpected(&sql, "no row returned"))?;
    Ok(row.1)
}

/// The partitioning clause is the final section of SHOW CREATE output:
/// wrapped in a `/*!50100 ... */` version comment on MySQL, bare on recent
/// MariaDB.
fn extract_partitioning(create_statement: &str) -> Option<String> {
    for (idx, _) in create_statement.match_indices('\n') {
        let rest = &create_statement[idx + 1..];
        let bare = rest.trim_start();
        if bare.starts_with("PARTITION BY")
            || (bare.starts_with("/*!") && bare.contains("PARTITION BY"))
        {
            return Some(rest.to_string());
        }
    }
    None
}

fn introspect_columns(
    conn: &mut PooledConn,
    flavor: &Flavor,
    schema_name: &str,
    summary: &TableSummary,
    default_collations: &BTreeMap<String, bool>,
) -> Result<Vec<Column>, InstanceError> {
    let generation_expr_column = if flavor.generated_columns() {
        "GENERATION_EXPRESSION"
    } else {
        "''"
    };
    let sql = format!(
        "SELECT COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, EXTRA, \
         CHARACTER_SET_NAME, COLLATION_NAME, COLUMN_COMMENT, {generation_expr_column} \
         FROM information_schema.COLUMNS \
         WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} \
         ORDER BY ORDINAL_POSITION",
        sql_string(schema_name),
        sql_string(&summary.name)
    );
    type Row = (
        String,
        String,
        String,
        Option<String>,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );
    let rows = conn
        .query::<Row, _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?;

    let mut columns = Vec::with_capacity(rows.len());
    for (
        name,
        column_type,
        is_nullable,
        raw_default,
        extra,
        char_set,
        collation,
        comment,
        generation_expr,
    ) in rows
    {
        let mut column = Column::new(name, column_type);
        column.nullable = is_nullable.eq_ignore_ascii_case("YES");
        column.auto_increment = extra.to_ascii_lowercase().contains("auto_increment");
        column.invisible = extra.to_ascii_uppercase().contains("INVISIBLE");
        column.char_set = char_set;
        column.collation_is_default = collation
            .as_deref()
            .and_then(|collation| default_collations.get(collation).copied())
            .unwrap_or(true);
        column.collation = collation;
        column.comment = comment.filter(|comment| !comment.is_empty());
        column.on_update = extract_on_update(&extra);
        column.generation = generation_expr
            .filter(|expr| !expr.is_empty())
            .map(|expr| Generation {
                expr,
                stored: extra.to_ascii_uppercase().contains("STORED"),
            });
        column.default = build_default(
            flavor,
            column.nullable,
            column.auto_increment,
            column.generation.is_some(),
            raw_default,
            &extra,
        );
        columns.push(column);
    }
    Ok(columns)
}

fn extract_on_update(extra: &str) -> Option<String> {
    let lowered = extra.to_ascii_lowercase();
    let idx = lowered.find("on update ")?;
    Some(extra[idx + "on update ".len()..].trim().to_string())
}

/// Interprets information_schema's COLUMN_DEFAULT per flavor. MariaDB 10.2+
/// stores defaults as SQL expressions (quoted literals, bare numerics);
/// MySQL stores bare literal text and flags expression defaults via EXTRA.
fn build_default(
    flavor: &Flavor,
    nullable: bool,
    auto_increment: bool,
    generated: bool,
    raw_default: Option<String>,
    extra: &str,
) -> ColumnDefault {
    if auto_increment || generated {
        return ColumnDefault::None;
    }
    let Some(raw) = raw_default else {
        return if nullable {
            ColumnDefault::Null
        } else {
            ColumnDefault::None
        };
    };

    if flavor.is_mariadb() && (flavor.major, flavor.minor) >= (10, 2) {
        if raw == "NULL" {
            return ColumnDefault::Null;
        }
        if let Some(inner) = raw.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')) {
            return ColumnDefault::Literal {
                value: inner.replace("''", "'"),
                quoted: true,
            };
        }
        if raw.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b'-') {
            return ColumnDefault::Literal {
                value: raw,
                quoted: false,
            };
        }
        return ColumnDefault::Expression(raw);
    }

    let upper = raw.to_ascii_uppercase();
    if upper.starts_with("CURRENT_TIMESTAMP") || extra.to_ascii_uppercase().contains("DEFAULT_GENERATED")
    {
        return ColumnDefault::Expression(raw);
    }
    if raw.starts_with("b'") {
        return ColumnDefault::Literal {
            value: raw,
            quoted: false,
        };
    }
    ColumnDefault::Literal {
        value: raw,
        quoted: true,
    }
}

fn introspect_indexes(
    conn: &mut PooledConn,
    flavor: &Flavor,
    schema_name: &str,
    table_name: &str,
) -> Result<(Option<Index>, Vec<Index>), InstanceError> {
    let extra_columns = if flavor.has_data_dictionary() {
        "EXPRESSION, IS_VISIBLE"
    } else {
        "NULL, 'YES'"
    };
    let sql = format!(
        "SELECT INDEX_NAME, NON_UNIQUE, SEQ_IN_INDEX, COLUMN_NAME, SUB_PART, COLLATION, \
         INDEX_TYPE, INDEX_COMMENT, {extra_columns} \
         FROM information_schema.STATISTICS \
         WHERE TABLE_SCHEMA = {} AND TABLE_NAME = {} \
         ORDER BY INDEX_NAME, SEQ_IN_INDEX",
        sql_string(schema_name),
        sql_string(table_name)
    );
    type Row = (
        String,
        u64,
        u32,
        Option<String>,
        Option<u32>,
        Option<String>,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
    );
    let rows = conn
        .query::<Row, _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?;

    let mut order = Vec::new();
    let mut grouped: BTreeMap<String, Index> = BTreeMap::new();
    for (
        index_name,
        non_unique,
        _seq_in_index,
        column_name,
        sub_part,
        part_collation,
        index_type,
        index_comment,
        expression,
        is_visible,
    ) in rows
    {
        let part = IndexPart {
            base: match (column_name, expression) {
                (Some(column), _) => IndexPartBase::Column(column),
                (None, Some(expr)) => IndexPartBase::Expression(expr),
                (None, None) => {
                    return Err(InstanceError::unexpected(
                        &sql,
                        format!("index `{index_name}` part with neither column nor expression"),
                    ));
                }
            },
            sub_part,
            descending: part_collation.as_deref() == Some("D"),
        };

        if let Some(index) = grouped.get_mut(&index_name) {
            index.parts.push(part);
            continue;
        }

        let primary_key = index_name == "PRIMARY";
        let mut index = Index::new(index_name.clone(), vec![part], primary_key, non_unique == 0);
        index.index_type = match index_type.to_ascii_uppercase().as_str() {
            "HASH" => IndexType::Hash,
            "FULLTEXT" => IndexType::FullText,
            "SPATIAL" => IndexType::Spatial,
            _ => IndexType::BTree,
        };
        index.invisible = is_visible.as_deref() == Some("NO");
        index.comment = index_comment.filter(|comment| !comment.is_empty());
        order.push(index_name.clone());
        grouped.insert(index_name, index);
    }

    let mut primary_key = None;
    let mut secondary_indexes = Vec::with_capacity(order.len());
    for name in order {
        let index = grouped.remove(&name).expect("grouped index present");
        if index.primary_key {
            primary_key = Some(index);
        } else {
            secondary_indexes.push(index);
        }
    }
    Ok((primary_key, secondary_indexes))
}

fn introspect_foreign_keys(
    conn: &mut PooledConn,
    schema_name: &str,
    table_name: &str,
) -> Result<Vec<ForeignKey>, InstanceError> {
    let sql = format!(
        "SELECT rc.CONSTRAINT_NAME, kcu.COLUMN_NAME, kcu.REFERENCED_TABLE_SCHEMA, \
         kcu.REFERENCED_TABLE_NAME, kcu.REFERENCED_COLUMN_NAME, rc.UPDATE_RULE, rc.DELETE_RULE \
         FROM information_schema.REFERENTIAL_CONSTRAINTS rc \
         JOIN information_schema.KEY_COLUMN_USAGE kcu \
           ON kcu.CONSTRAINT_SCHEMA = rc.CONSTRAINT_SCHEMA \
          AND kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME \
          AND kcu.TABLE_NAME = rc.TABLE_NAME \
         WHERE rc.CONSTRAINT_SCHEMA = {} AND rc.TABLE_NAME = {} \
         ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION",
        sql_string(schema_name),
        sql_string(table_name)
    );
    type Row = (
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
        String,
    );
    let rows = conn
        .query::<Row, _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?;

    let mut order = Vec::new();
    let mut grouped: BTreeMap<String, ForeignKey> = BTreeMap::new();
    for (name, column, referenced_schema, referenced_table, referenced_column, update_rule, delete_rule) in
        rows
    {
        if let Some(foreign_key) = grouped.get_mut(&name) {
            foreign_key.columns.push(column);
            if let Some(referenced_column) = referenced_column {
                foreign_key.referenced_columns.push(referenced_column);
            }
            continue;
        }

        let referenced_schema = referenced_schema
            .filter(|referenced| referenced != schema_name)
            .unwrap_or_default();
        order.push(name.clone());
        grouped.insert(
            name.clone(),
            ForeignKey {
                name,
                columns: vec![column],
                referenced_schema,
                referenced_table: referenced_table.unwrap_or_default(),
                referenced_columns: referenced_column.into_iter().collect(),
                update_rule: normalize_fk_rule(&update_rule),
                delete_rule: normalize_fk_rule(&delete_rule),
            },
        );
    }

    Ok(order
        .into_iter()
        .map(|name| grouped.remove(&name).expect("grouped foreign key present"))
        .collect())
}

/// RESTRICT (and its InnoDB synonym NO ACTION) is elided by SHOW CREATE.
fn normalize_fk_rule(rule: &str) -> String {
    match rule.to_ascii_uppercase().as_str() {
        "RESTRICT" | "NO ACTION" => String::new(),
        _ => rule.to_string(),
    }
}

fn introspect_routines(
    conn: &mut PooledConn,
    flavor: &Flavor,
    schema_name: &str,
) -> Result<Vec<Routine>, InstanceError> {
    let sql = format!(
        "SELECT ROUTINE_NAME, ROUTINE_TYPE, DTD_IDENTIFIER, ROUTINE_DEFINITION, DEFINER, \
         SQL_MODE, DATABASE_COLLATION, IS_DETERMINISTIC, SQL_DATA_ACCESS, SECURITY_TYPE, \
         ROUTINE_COMMENT \
         FROM information_schema.ROUTINES \
         WHERE ROUTINE_SCHEMA = {} \
         ORDER BY ROUTINE_NAME",
        sql_string(schema_name)
    );
    type Row = (
        String,
        String,
        Option<String>,
        Option<String>,
        String,
        String,
        String,
        String,
        String,
        String,
        Option<String>,
    );
    let rows = conn
        .query::<Row, _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?;

    let mut routines = Vec::with_capacity(rows.len());
    for (
        name,
        routine_type_raw,
        return_type,
        body,
        definer,
        sql_mode,
        database_collation,
        is_deterministic,
        sql_data_access,
        security_type,
        comment,
    ) in rows
    {
        let routine_type = if routine_type_raw.eq_ignore_ascii_case("FUNCTION") {
            RoutineType::Function
        } else {
            RoutineType::Procedure
        };
        let param_string = routine_param_string(conn, flavor, schema_name, &name, routine_type)?;

        let mut characteristics = Vec::new();
        if is_deterministic.eq_ignore_ascii_case("YES") {
            characteristics.push("DETERMINISTIC".to_string());
        }
        match sql_data_access.to_ascii_uppercase().as_str() {
            "CONTAINS SQL" => {}
            other => characteristics.push(other.to_string()),
        }
        if security_type.eq_ignore_ascii_case("INVOKER") {
            characteristics.push("SQL SECURITY INVOKER".to_string());
        }
        if let Some(comment) = comment.filter(|comment| !comment.is_empty()) {
            characteristics.push(format!(
                "COMMENT {}",
                driftql_core::ident::quote_value(&comment)
            ));
        }

        routines.push(Routine {
            routine_type,
            name,
            definer,
            param_string,
            return_type: (routine_type == RoutineType::Function)
                .then_some(return_type)
                .flatten(),
            body: body.unwrap_or_default(),
            characteristics,
            sql_mode: sql_mode.clone(),
            creation_sql_mode: sql_mode,
            database_collation,
        });
    }
    Ok(routines)
}

/// The parameter string comes from information_schema.PARAMETERS on
/// data-dictionary servers; older servers only expose it through
/// `SHOW CREATE` per routine.
fn routine_param_string(
    conn: &mut PooledConn,
    flavor: &Flavor,
    schema_name: &str,
    routine_name: &str,
    routine_type: RoutineType,
) -> Result<String, InstanceError> {
    if !flavor.has_data_dictionary() {
        return show_create_param_string(conn, schema_name, routine_name, routine_type);
    }

    let sql = format!(
        "SELECT PARAMETER_MODE, PARAMETER_NAME, DTD_IDENTIFIER \
         FROM information_schema.PARAMETERS \
         WHERE SPECIFIC_SCHEMA = {} AND SPECIFIC_NAME = {} AND ORDINAL_POSITION > 0 \
         ORDER BY ORDINAL_POSITION",
        sql_string(schema_name),
        sql_string(routine_name)
    );
    let rows = conn
        .query::<(Option<String>, Option<String>, Option<String>), _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?;

    let params = rows
        .into_iter()
        .map(|(mode, name, data_type)| {
            let mut rendered = String::new();
            if routine_type == RoutineType::Procedure
                && let Some(mode) = mode
            {
                rendered.push_str(&mode);
                rendered.push(' ');
            }
            if let Some(name) = name {
                rendered.push_str(&driftql_core::ident::quote_ident(&name));
                rendered.push(' ');
            }
            rendered.push_str(data_type.as_deref().unwrap_or_default());
            rendered
        })
        .collect::<Vec<_>>();
    Ok(params.join(","))
}

fn show_create_param_string(
    conn: &mut PooledConn,
    schema_name: &str,
    routine_name: &str,
    routine_type: RoutineType,
) -> Result<String, InstanceError> {
    let sql = format!(
        "SHOW CREATE {} {}",
        routine_type.keyword(),
        driftql_core::ident::quote_qualified(schema_name, routine_name)
    );
    let row = conn
        .query::<mysql::Row, _>(sql.as_str())
        .map_err(|source| InstanceError::query(&sql, source))?
        .into_iter()
        .next()
        .ok_or_else(|| InstanceError::unexpected(&sql, "no row returned"))?;
    let create: Option<String> = row.get(2);
    let create =
        create.ok_or_else(|| InstanceError::unexpected(&sql, "missing create statement column"))?;
    Ok(extract_param_string(&create).unwrap_or_default())
}

/// Pulls the parenthesized parameter list out of a `SHOW CREATE` routine
/// statement via a paren-balance scan, honoring quotes.
fn extract_param_string(create: &str) -> Option<String> {
    let open = create.find('(')?;
    let mut depth = 0usize;
    let mut in_quote: Option<char> = None;
    for (idx, ch) in create[open..].char_indices() {
        match in_quote {
            Some(quote) => {
                if ch == quote {
                    in_quote = None;
                }
            }
            None => match ch {
                '\'' | '"' | '`' => in_quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(create[open + 1..open + idx].to_string());
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Quotes a string literal for direct embedding in an information_schema
/// query.
fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn char_set_of_collation(collation: &str) -> String {
    collation
        .split('_')
        .next()
        .unwrap_or(collation)
        .to_string()
}
