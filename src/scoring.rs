use crate::error::{AdvisorError, Result};
use crate::models::{FeatureVector, OptionId, ResponseScale};

/// Count answers per weight bucket.
///
/// Bucket `w` of the result holds the number of answers whose option has
/// weight `w`. Every entry must be set.
pub fn score(answers: &[Option<OptionId>], scale: &ResponseScale) -> Result<FeatureVector> {
    let mut counts = vec![0u32; scale.bucket_count()];

    for (position, answer) in answers.iter().enumerate() {
        let option = answer.ok_or(AdvisorError::IncompleteInput { position })?;
        let weight = scale.weight_of(option).ok_or_else(|| {
            AdvisorError::invalid_state(format!(
                "answer {} refers to unknown option {}",
                position, option
            ))
        })?;
        counts[weight as usize] += 1;
    }

    Ok(FeatureVector::new(counts))
}
