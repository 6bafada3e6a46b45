//! Consent cleanup (§4.10 step 1): if any participant denied recording
//! consent, the mixed audio object is deleted and never recreated. Deletion
//! is idempotent at the storage layer (a missing-key delete is not an
//! error) and `audio_deleted` is a one-way flag.

use meet_shared::clients::StorageClient;
use meet_shared::Participant;

use crate::error::PipelineResult;

pub fn any_consent_denied(participants: &[Participant]) -> bool {
    participants
        .iter()
        .any(|p| matches!(p.consent, Some(meet_shared::ConsentState::Denied)))
}

pub async fn delete_mix_object(storage: &StorageClient, bucket: &str, key: &str) -> PipelineResult<()> {
    storage
        .delete(bucket, key)
        .await
        .map_err(|e| crate::error::PipelineError::transient(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meet_shared::ConsentState;
    use uuid::Uuid;

    fn participant(consent: Option<ConsentState>) -> Participant {
        Participant { id: Uuid::now_v7(), speaker: Some(0), name: "A".into(), consent }
    }

    #[test]
    fn detects_any_denied() {
        let participants = vec![participant(Some(ConsentState::Given)), participant(Some(ConsentState::Denied))];
        assert!(any_consent_denied(&participants));
    }

    #[test]
    fn no_denial_when_all_given_or_unknown() {
        let participants = vec![participant(Some(ConsentState::Given)), participant(None)];
        assert!(!any_consent_denied(&participants));
    }
}
