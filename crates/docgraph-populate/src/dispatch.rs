//! Dispatch of one populator against a set of holder documents.
//!
//! Reference strategies claim their unseen ids, issue one lookup, register
//! what comes back and recurse into it. Embedded strategies register nothing;
//! they collect the nested sub-documents and dispatch each child populator on
//! them, joining the children before returning.

use crate::error::{PopulateError, Result};
use crate::populator::{Cardinality, Populator};
use crate::population::Population;
use docgraph_store::Document;
use futures::future::{try_join_all, BoxFuture, FutureExt};

impl Population {
    pub(crate) fn dispatch<'a>(
        &'a self,
        field: &'a str,
        populator: &'a Populator,
        holders: Vec<&'a Document>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            match populator {
                Populator::Element(target) | Populator::Array(target) => {
                    let cardinality = match populator {
                        Populator::Element(_) => Cardinality::One,
                        _ => Cardinality::Many,
                    };

                    let collected = populator.collect_ids(field, &holders);
                    if !collected.invalid.is_empty() {
                        self.check_invalid(target, field, &collected.invalid)?;
                    }
                    let unseen = self.claim(&target.key, collected.ids);
                    if unseen.is_empty() {
                        return Ok(());
                    }

                    if !self.registry.contains(target.key.as_str())
                        || !self.store.has_model(&target.model)
                    {
                        return Err(PopulateError::MissingPopulator {
                            key: target.key.clone(),
                        });
                    }

                    tracing::debug!(
                        field,
                        key = %target.key,
                        kind = populator.kind(),
                        ids = unseen.len(),
                        "fetching references"
                    );
                    let fetched = target
                        .populate(self.store.as_ref(), cardinality, &unseen)
                        .await?;
                    self.resolve(target, fetched, &unseen).await
                }
                Populator::Embedded(embedded) | Populator::EmbeddedArray(embedded) => {
                    let nested = populator.embedded_holders(field, &holders);
                    if nested.is_empty() {
                        return Ok(());
                    }

                    tracing::debug!(
                        field,
                        kind = populator.kind(),
                        documents = nested.len(),
                        "descending into embedded documents"
                    );
                    try_join_all(
                        embedded
                            .populators
                            .iter()
                            .map(|(name, child)| self.dispatch(name, child, nested.clone())),
                    )
                    .await?;
                    Ok(())
                }
            }
        }
        .boxed()
    }
}
