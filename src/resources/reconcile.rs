use serde::Deserialize;
use std::collections::HashMap;

use crate::resources::{BatchContext, ResourceError, Submission};

/// Operations produced from one write batch
#[derive(Debug)]
pub struct Plan<I, U> {
    pub inserts: Vec<I>,
    pub updates: Vec<U>,
}

impl<I, U> Plan<I, U> {
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a stream of YAML documents into submissions, in order.
///
/// Records are decoded strictly: unknown or duplicate fields are errors.
/// Empty documents (a bare `---`) are skipped. The iterator yields a
/// `Decode` error carrying the zero-based record index for the first
/// malformed document; callers stop there.
pub fn decode_batch<S: Submission>(body: &str) -> impl Iterator<Item = Result<S, ResourceError>> + '_ {
    serde_yaml::Deserializer::from_str(body)
        .filter_map(|document| match Option::<S>::deserialize(document) {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        })
        .enumerate()
        .map(|(index, result)| {
            result.map_err(|err| ResourceError::Decode {
                kind: S::KIND,
                index,
                message: err.to_string(),
            })
        })
}

/// Split submitted records into inserts and updates against the tenant's
/// existing `name -> type` index.
///
/// A record whose name already exists is validated and becomes an update,
/// unless it names a different type, which fails the batch. Any other record becomes an
/// insert. The first decode or validation error fails the whole batch, as
/// does a batch with no records at all.
pub fn reconcile<S, R>(
    existing: &HashMap<String, String>,
    submitted: R,
    ctx: &BatchContext,
) -> Result<Plan<S::Insert, S::Update>, ResourceError>
where
    S: Submission,
    R: IntoIterator<Item = Result<S, ResourceError>>,
{
    let mut plan = Plan {
        inserts: Vec::new(),
        updates: Vec::new(),
    };

    for record in submitted {
        let record = record?;
        let Some(current) = existing.get(record.name()) else {
            plan.inserts.push(record.into_insert(ctx)?);
            continue;
        };

        let name = record.name().to_string();
        let attempted = record.submitted_type().to_string();
        // Validation errors win over a type change on the same record.
        let update = record.into_update(current, ctx)?;
        if !attempted.is_empty() && &attempted != current {
            return Err(ResourceError::TypeChange {
                kind: S::KIND,
                name,
                current: current.clone(),
                attempted,
            });
        }
        // TODO: skip no-op updates so unchanged records keep their updated_at.
        plan.updates.push(update);
    }

    if plan.is_empty() {
        return Err(ResourceError::EmptyBatch { kind: S::KIND });
    }
    Ok(plan)
}
