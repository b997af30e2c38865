//! Deterministic, URL-safe slugs derived from post titles.
//!
//! Normalization is pure. Uniqueness is resolved against a caller-supplied
//! async predicate so this module never touches storage directly.

use std::future::Future;

use thiserror::Error;

/// Upper bound on numeric suffixes tried before giving up on a base slug.
pub const MAX_SLUG_PROBES: u32 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("`{input}` has no characters usable in a slug")]
    Unrepresentable { input: String },
    #[error("exhausted {MAX_SLUG_PROBES} suffixes looking for a free slug based on `{base}`")]
    Exhausted { base: String },
}

/// Failure of [`resolve_unique_slug`]: either the probe budget ran out or the
/// predicate itself failed.
#[derive(Debug, Error)]
pub enum SlugResolveError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Lowercases, turns whitespace into hyphens, drops anything outside
/// `[a-z0-9-]`, collapses hyphen runs and trims hyphens at both ends.
///
/// The result is either empty or matches `^[a-z0-9]+(-[a-z0-9]+)*$`.
pub fn normalize(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        }
    }

    slug
}

/// [`normalize`], rejecting titles that leave nothing behind.
pub fn derive_slug(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = normalize(title);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: title.to_string(),
        });
    }

    Ok(candidate)
}

pub fn with_suffix(base: &str, suffix: u32) -> String {
    format!("{base}-{suffix}")
}

/// Probes `base`, then `base-1`, `base-2`, ... up to `base-{MAX_SLUG_PROBES}`,
/// returning the first candidate for which `is_taken` answers `false`.
pub async fn resolve_unique_slug<F, Fut, E>(
    base: &str,
    mut is_taken: F,
) -> Result<String, SlugResolveError<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    if !is_taken(base.to_string())
        .await
        .map_err(SlugResolveError::Predicate)?
    {
        return Ok(base.to_string());
    }

    for suffix in 1..=MAX_SLUG_PROBES {
        let candidate = with_suffix(base, suffix);
        if !is_taken(candidate.clone())
            .await
            .map_err(SlugResolveError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugResolveError::Slug(SlugError::Exhausted {
        base: base.to_string(),
    }))
}

/// Checks the shape every stored slug must have.
pub fn is_well_formed(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
