/// Whether changing a column from `old` to `new` can lose data. Both
/// strings are server-normalized type spellings (`int unsigned`,
/// `varchar(30)`, `decimal(10,2)`).
pub fn type_narrows(old: &str, new: &str) -> bool {
    if old == new {
        return false;
    }

    let old_type = ParsedType::parse(old);
    let new_type = ParsedType::parse(new);

    if old_type.base != new_type.base {
        return cross_family_narrows(&old_type, &new_type);
    }

    if old_type.unsigned != new_type.unsigned {
        // flipping the sign bit shifts the representable range either way
        return true;
    }

    match old_type.base.as_str() {
        "enum" | "set" => !member_list_is_prefix(&old_type.args, &new_type.args),
        // integer display widths are cosmetic, never capacity
        "tinyint" | "smallint" | "mediumint" | "int" | "bigint" => false,
        _ => numeric_args_shrink(&old_type.args, &new_type.args),
    }
}

fn cross_family_narrows(old: &ParsedType, new: &ParsedType) -> bool {
    if let (Some(old_rank), Some(new_rank)) = (family_rank(&old.base), family_rank(&new.base)) {
        if old.unsigned != new.unsigned {
            return true;
        }
        return new_rank < old_rank;
    }
    // unrelated families: a conversion is always potentially lossy
    true
}

/// Rank within a widening family; families are disjoint ranges so that
/// e.g. int→text never looks like a widening.
fn family_rank(base: &str) -> Option<u32> {
    match base {
        "tinyint" => Some(1),
        "smallint" => Some(2),
        "mediumint" => Some(3),
        "int" => Some(4),
        "bigint" => Some(5),

        "float" => Some(11),
        "double" => Some(12),

        "tinytext" => Some(21),
        "text" => Some(22),
        "mediumtext" => Some(23),
        "longtext" => Some(24),

        "tinyblob" => Some(31),
        "blob" => Some(32),
        "mediumblob" => Some(33),
        "longblob" => Some(34),

        _ => None,
    }
}

fn numeric_args_shrink(old: &[u64], new: &[u64]) -> bool {
    // compares (length) or (precision, scale) pairs positionally; a missing
    // new argument with an old one present means the dimension shrank to
    // the server default
    for (position, old_arg) in old.iter().enumerate() {
        match new.get(position) {
            Some(new_arg) if new_arg >= old_arg => {}
            Some(_) => return true,
            None => return *old_arg > 0,
        }
    }
    false
}

fn member_list_is_prefix(old: &[u64], new: &[u64]) -> bool {
    // enum/set member identity is tracked via hashes stored in args; the
    // old list must be an unchanged prefix of the new one
    new.len() >= old.len() && new[..old.len()] == *old
}

struct ParsedType {
    base: String,
    args: Vec<u64>,
    unsigned: bool,
}

impl ParsedType {
    fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        let unsigned = lowered.contains("unsigned");

        let (base, args) = match lowered.find('(') {
            Some(open) => {
                let close = lowered.rfind(')').unwrap_or(lowered.len());
                let base = lowered[..open].trim().to_string();
                let inner = &lowered[open + 1..close];
                let args = if base == "enum" || base == "set" {
                    inner.split(',').map(|member| fingerprint(member.trim())).collect()
                } else {
                    inner
                        .split(',')
                        .filter_map(|arg| arg.trim().parse::<u64>().ok())
                        .collect()
                };
                (base, args)
            }
            None => (
                lowered
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                Vec::new(),
            ),
        };

        Self {
            base,
            args,
            unsigned,
        }
    }
}

fn fingerprint(member: &str) -> u64 {
    // FNV-1a; only equality of members matters here
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in member.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x1000_0000_01b3);
    }
    hash
}
