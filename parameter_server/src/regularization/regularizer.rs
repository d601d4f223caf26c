use std::{collections::HashMap, sync::Arc};

use comms::specs::RegularizerSettings;
use log::{debug, warn};
use model::{DenseMatrix, PhiMatrix};

/// The regularizers of an instance, by name.
pub type RegularizerMap = HashMap<String, Arc<dyn Regularizer>>;

/// A pluggable contribution to the regularization term of a model.
pub trait Regularizer: Send + Sync {
    /// Computes this regularizer contribution for every cell of `nwt`.
    ///
    /// # Arguments
    /// * `pwt` - The current probabilities.
    /// * `nwt` - The current counts.
    /// * `rwt` - A zero matrix shaped like `nwt` to write the contribution into.
    ///
    /// # Returns
    /// `false` if the regularizer has nothing to contribute, `rwt` is ignored then.
    fn regularize_phi(&self, pwt: &dyn PhiMatrix, nwt: &dyn PhiMatrix, rwt: &mut DenseMatrix) -> bool;
}

/// Sums the contributions of the regularizers named in `settings`, each scaled by its tau.
///
/// Regularizers that aren't registered in `regularizers` are skipped with a warning.
///
/// # Arguments
/// * `name` - The name of the resulting matrix.
/// * `pwt` - The current probabilities.
/// * `nwt` - The current counts, fixes the shape of the result.
/// * `settings` - Which regularizers to invoke, in order.
/// * `regularizers` - The registered regularizers.
///
/// # Returns
/// The regularization term, a zero matrix when no regularizer contributes.
pub fn invoke_regularizers(
    name: &str,
    pwt: &dyn PhiMatrix,
    nwt: &dyn PhiMatrix,
    settings: &[RegularizerSettings],
    regularizers: &RegularizerMap,
) -> model::Result<DenseMatrix> {
    let mut rwt = DenseMatrix::zeros_like(name, nwt)?;

    for setting in settings {
        let Some(regularizer) = regularizers.get(&setting.name) else {
            warn!(regularizer = setting.name.as_str(); "regularizer does not exist, skipping");
            continue;
        };

        let mut contribution = DenseMatrix::zeros_like(name, nwt)?;
        if !regularizer.regularize_phi(pwt, nwt, &mut contribution) {
            debug!(regularizer = setting.name.as_str(); "regularizer contributed nothing");
            continue;
        }

        rwt.add_scaled(&contribution, setting.tau as f32)?;
    }

    Ok(rwt)
}
