use super::domain::{AdoptLeaveScore, ComponentKey, DerivationError};
use crate::config::{ComponentSpec, SubCodeSpec};
use crate::workflows::answers::AnswerStore;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct BandTotals {
    adopt: f64,
    leave: f64,
    respondents: f64,
}

impl BandTotals {
    fn absorb<S: AnswerStore + ?Sized>(
        &mut self,
        store: &S,
        key: &ComponentKey,
        sub_code: &SubCodeSpec,
    ) -> Result<(), DerivationError> {
        let response_code = sub_code.response_code(&key.stakeholder);
        let distribution = store.fetch_distribution(&response_code, &key.country)?;

        let bottom = distribution.bottom_band(sub_code.bottom_levels)?;
        let top = distribution.top_band(sub_code.answer_length, sub_code.top_levels)?;
        self.respondents += distribution.total_from_end(sub_code.total_offset_from_end)?;

        if sub_code.adopt_is_top {
            self.adopt += top;
            self.leave += bottom;
        } else {
            self.adopt += bottom;
            self.leave += top;
        }
        Ok(())
    }
}

/// Blends every sub-code of a component into one adopt/leave pair.
///
/// Band counts and respondent totals are summed across sub-codes before the
/// single division, so larger sub-populations weigh more.
pub fn component_score<S: AnswerStore + ?Sized>(
    store: &S,
    key: &ComponentKey,
    spec: &ComponentSpec,
) -> Result<AdoptLeaveScore, DerivationError> {
    if spec.sub_codes.is_empty() {
        return Err(DerivationError::MissingInput(format!(
            "component {key} has no sub-codes"
        )));
    }

    let mut totals = BandTotals::default();
    for sub_code in &spec.sub_codes {
        totals.absorb(store, key, sub_code)?;
    }

    if totals.respondents == 0.0 {
        return Err(DerivationError::ZeroTotal {
            context: format!("component {key}"),
        });
    }

    let score = AdoptLeaveScore {
        adopt: totals.adopt / totals.respondents,
        leave: totals.leave / totals.respondents,
    };
    debug!(%key, adopt = score.adopt, leave = score.leave, "component score");
    Ok(score)
}
