//! Condition registry
//!
//! Validated create, update and delete of condition atoms, plus the advisory
//! similarity lookup used while editing.

use crate::error::{ConsumerKind, Reference, RepositoryError, RepositoryResult};
use crate::traits::{AtomRepository, FilterRepository};
use newsfilter_compiler::ReferenceKind;
use newsfilter_core::{ConditionAtom, CoreError, FieldCatalog, FilterValue, OperatorKind};
use std::sync::Arc;

/// Registry of condition atoms
pub struct ConditionRegistry {
    atoms: Arc<dyn AtomRepository>,
    filters: Arc<dyn FilterRepository>,
}

impl ConditionRegistry {
    pub fn new(atoms: Arc<dyn AtomRepository>, filters: Arc<dyn FilterRepository>) -> Self {
        Self { atoms, filters }
    }

    pub async fn get(&self, id: &str) -> RepositoryResult<ConditionAtom> {
        self.atoms
            .get_atom(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                kind: ReferenceKind::Atom,
                id: id.to_string(),
            })
    }

    pub async fn list(&self) -> RepositoryResult<Vec<ConditionAtom>> {
        self.atoms.list_atoms().await
    }

    /// Validate and store a new atom, assigning an id when it has none
    pub async fn create(
        &self,
        catalog: &FieldCatalog,
        mut atom: ConditionAtom,
    ) -> RepositoryResult<ConditionAtom> {
        if atom.id.is_empty() {
            atom.id = uuid::Uuid::new_v4().to_string();
        }
        if atom.name.is_empty() {
            atom.name = atom.id.clone();
        }

        self.check(catalog, &atom).await?;
        self.atoms.insert_atom(atom.clone()).await?;
        tracing::info!(
            "Created filter condition '{}' ({} {} {})",
            atom.name,
            atom.field,
            atom.operator,
            atom.value
        );
        Ok(atom)
    }

    /// Re-validate against the current catalog and store
    pub async fn update(&self, catalog: &FieldCatalog, atom: ConditionAtom) -> RepositoryResult<()> {
        self.get(&atom.id).await?;
        self.check(catalog, &atom).await?;
        self.atoms.update_atom(atom.clone()).await?;
        tracing::info!("Updated filter condition '{}'", atom.name);
        Ok(())
    }

    /// Delete an atom no content filter references
    pub async fn delete(&self, id: &str) -> RepositoryResult<()> {
        self.get(id).await?;

        let referencing = self.filters.filters_referencing_atom(id).await?;
        if !referencing.is_empty() {
            return Err(RepositoryError::InUse {
                kind: ReferenceKind::Atom,
                id: id.to_string(),
                references: referencing
                    .into_iter()
                    .map(|f| Reference::new(ConsumerKind::ContentFilter, f.name))
                    .collect(),
            });
        }

        self.atoms.delete_atom(id).await?;
        tracing::info!("Deleted filter condition '{}'", id);
        Ok(())
    }

    /// Atoms similar to `candidate`, advisory only.
    ///
    /// For an `in` / `nin` candidate this is every atom with the same operator
    /// whose value contains the candidate value, plus every atom with the
    /// complementary operator whose value does not. Any other operator finds
    /// the atoms with the same operator and an equal value, ignoring case.
    pub async fn find_similar(
        &self,
        catalog: &FieldCatalog,
        candidate: &ConditionAtom,
    ) -> RepositoryResult<Vec<ConditionAtom>> {
        if !catalog.contains(&candidate.field) {
            return Err(CoreError::UnknownField(candidate.field.clone()).into());
        }
        let needle = candidate.value.to_lowercase();

        let same_operator = self
            .atoms
            .find_atoms(&candidate.field, &candidate.operator)
            .await?;

        let complement = match candidate.operator.parse::<OperatorKind>() {
            Ok(OperatorKind::In) => OperatorKind::NotIn,
            Ok(OperatorKind::NotIn) => OperatorKind::In,
            _ => {
                return Ok(same_operator
                    .into_iter()
                    .filter(|a| a.value.to_lowercase() == needle)
                    .collect());
            }
        };

        let mut similar: Vec<ConditionAtom> = same_operator
            .into_iter()
            .filter(|a| a.value.to_lowercase().contains(&needle))
            .collect();
        similar.extend(
            self.atoms
                .find_atoms(&candidate.field, complement.token())
                .await?
                .into_iter()
                .filter(|a| !a.value.to_lowercase().contains(&needle)),
        );

        Ok(similar)
    }

    /// Catalog, value, name and duplicate checks shared by create and update
    async fn check(&self, catalog: &FieldCatalog, atom: &ConditionAtom) -> RepositoryResult<()> {
        let operator = catalog.check_operator(&atom.field, &atom.operator)?;
        let field = catalog.resolve(&atom.field)?;
        FilterValue::parse(&atom.field, &atom.value, operator, field.value_type())?;

        let existing = self.atoms.list_atoms().await?;
        if existing
            .iter()
            .any(|a| a.id != atom.id && a.name == atom.name)
        {
            return Err(RepositoryError::DuplicateName {
                kind: ReferenceKind::Atom,
                name: atom.name.clone(),
            });
        }

        let key = FilterValue::comparison_key(&atom.value);
        if let Some(duplicate) = existing.iter().find(|a| {
            a.id != atom.id
                && a.field == atom.field
                && a.operator == atom.operator
                && FilterValue::comparison_key(&a.value) == key
        }) {
            return Err(RepositoryError::DuplicateAtom {
                existing: duplicate.name.clone(),
            });
        }

        Ok(())
    }
}
