//! Resolve `owner:branch` tokens through the fork relationship

use crate::error::{Error, Result};
use crate::store::RepositoryStore;
use crate::types::{BranchRef, Repository};

/// Split an `owner:branch` token
pub fn parse_branch_token(token: &str) -> Result<(&str, &str)> {
    match token.split_once(':') {
        Some((owner, branch)) if !owner.is_empty() && !branch.is_empty() => Ok((owner, branch)),
        _ => Err(Error::InvalidBranchRef(token.to_string())),
    }
}

/// Resolve `token` relative to `upstream`
///
/// The owner names either the upstream itself or one of its forks.
pub async fn resolve_branch_ref(
    store: &dyn RepositoryStore,
    upstream: &Repository,
    token: &str,
) -> Result<BranchRef> {
    let (owner, branch) = parse_branch_token(token)?;

    let repo = if upstream.is_owned_by(owner) {
        upstream.clone()
    } else {
        store
            .lookup_fork(upstream.id, owner)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("fork of {} owned by '{owner}'", upstream.full_name()))
            })?
    };

    Ok(BranchRef {
        repo,
        branch: branch.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_branch_token() {
        assert_eq!(parse_branch_token("bob:feature").unwrap(), ("bob", "feature"));
        assert_eq!(
            parse_branch_token("bob:release:1.0").unwrap(),
            ("bob", "release:1.0")
        );
    }

    #[test]
    fn test_parse_branch_token_malformed() {
        for token in ["feature", ":feature", "bob:", ""] {
            match parse_branch_token(token) {
                Err(Error::InvalidBranchRef(t)) => assert_eq!(t, token),
                other => panic!("Expected InvalidBranchRef for {token:?}, got: {other:?}"),
            }
        }
    }
}
