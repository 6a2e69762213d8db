use std::cmp::Ordering;

/// Compares dotted version strings numerically: `1.10.0 > 1.9.9`.
///
/// Missing components count as zero. A numeric component outranks a textual
/// one, so `1.0.0 > 1.0.0-beta`.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = components(a);
    let right = components(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let ordering = match (left.get(i), right.get(i)) {
            (Some(l), Some(r)) => compare_component(l, r),
            (Some(l), None) => compare_component(l, &Part::Number(0)),
            (None, Some(r)) => compare_component(&Part::Number(0), r),
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[derive(Debug, PartialEq, Eq)]
enum Part<'a> {
    Number(u64),
    Text(&'a str),
}

fn components(version: &str) -> Vec<Part<'_>> {
    version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split(['.', '-', '+', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().map_or(Part::Text(part), Part::Number))
        .collect()
}

fn compare_component(l: &Part<'_>, r: &Part<'_>) -> Ordering {
    match (l, r) {
        (Part::Number(a), Part::Number(b)) => a.cmp(b),
        (Part::Number(_), Part::Text(_)) => Ordering::Greater,
        (Part::Text(_), Part::Number(_)) => Ordering::Less,
        (Part::Text(a), Part::Text(b)) => a.cmp(b),
    }
}
