//! On-demand evaluation of a stored interview.

use crate::context::SessionContext;
use crate::error::InterviewError;
use crate::evaluator::{Evaluator, evaluate_record};
use crate::interview::{InterviewRecord, RecordId};
use crate::store::InterviewStore;

/// Scores a stored interview and attaches the result, replacing any earlier one.
///
/// Runs the evaluator once with no retry. On failure the record keeps whatever
/// evaluation it had before. The owner's skill profile is updated afterwards;
/// a failure there is logged and does not fail the call.
pub async fn evaluate_interview<S, E>(
    ctx: &SessionContext,
    id: RecordId,
    store: &S,
    evaluator: &E,
) -> Result<InterviewRecord, InterviewError>
where
    S: InterviewStore + ?Sized,
    E: Evaluator + ?Sized,
{
    let record = store.fetch(ctx, id).await?;

    let historical_weaknesses = match store.load_profile(ctx).await {
        Ok(profile) => profile.weaknesses,
        Err(e) => {
            tracing::warn!("Could not load skill profile for {}: {}", ctx.owner, e);
            vec![]
        }
    };

    let result = evaluate_record(evaluator, &record.session, &historical_weaknesses)
        .await
        .map_err(|e| {
            tracing::error!("Evaluation of interview {} failed: {:#}", id, e);
            InterviewError::EvaluationFailed(format!("{e:#}"))
        })?;

    let strengths = result.strengths.clone();
    let weaknesses = result.weaknesses.clone();
    let updated = store.attach_evaluation(ctx, id, result).await?;
    tracing::info!("Attached evaluation to interview {}", id);

    if let Err(e) = update_profile(ctx, store, &strengths, &weaknesses).await {
        tracing::warn!("Failed to update skill profile for {}: {}", ctx.owner, e);
    }

    Ok(updated)
}

async fn update_profile<S: InterviewStore + ?Sized>(
    ctx: &SessionContext,
    store: &S,
    strengths: &[String],
    weaknesses: &[String],
) -> Result<(), crate::error::StoreError> {
    let mut profile = store.load_profile(ctx).await?;
    profile.merge(strengths, weaknesses);
    store.save_profile(ctx, profile).await
}
