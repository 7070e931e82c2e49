//! Fuzzy term matching up to [`MAX_FUZZINESS`] edits
//!
//! tantivy's `FuzzyTermQuery` only caches automaton builders up to distance
//! 2. Larger distances go through [`WideFuzzyTermQuery`], which builds the
//! Levenshtein DFA itself and hands it to an `AutomatonWeight`.

use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};
use once_cell::sync::OnceCell;
use tantivy::query::{AutomatonWeight, EnableScoring, FuzzyTermQuery, Query, Weight};
use tantivy::schema::Field;
use tantivy::{TantivyError, Term};
use tantivy_fst::Automaton;

use crate::search::config::MAX_FUZZINESS;

/// Largest distance `FuzzyTermQuery` accepts
const BUILTIN_MAX_FUZZINESS: u8 = 2;

/// Fuzzy query on one token, picking the implementation by distance
pub(crate) fn fuzzy_term_query(field: Field, token: &str, distance: u8) -> Box<dyn Query> {
    if distance <= BUILTIN_MAX_FUZZINESS {
        Box::new(FuzzyTermQuery::new(
            Term::from_field_text(field, token),
            distance,
            true,
        ))
    } else {
        Box::new(WideFuzzyTermQuery::new(field, token, distance))
    }
}

/// Matches terms within `distance` edits of `text`, transpositions costing one
#[derive(Debug, Clone)]
pub struct WideFuzzyTermQuery {
    field: Field,
    text: String,
    distance: u8,
}

impl WideFuzzyTermQuery {
    pub fn new(field: Field, text: impl Into<String>, distance: u8) -> Self {
        Self {
            field,
            text: text.into(),
            distance,
        }
    }
}

impl Query for WideFuzzyTermQuery {
    fn weight(&self, _enable_scoring: EnableScoring<'_>) -> tantivy::Result<Box<dyn Weight>> {
        let dfa = automaton_builder(self.distance)?.build_dfa(&self.text);
        Ok(Box::new(AutomatonWeight::new(self.field, LevenshteinDfa(dfa))))
    }
}

/// Builders are expensive, so one per distance is kept for the process
fn automaton_builder(distance: u8) -> tantivy::Result<&'static LevenshteinAutomatonBuilder> {
    static BUILDERS: [OnceCell<LevenshteinAutomatonBuilder>; MAX_FUZZINESS as usize + 1] = [
        OnceCell::new(),
        OnceCell::new(),
        OnceCell::new(),
        OnceCell::new(),
        OnceCell::new(),
    ];

    let cell = BUILDERS.get(distance as usize).ok_or_else(|| {
        TantivyError::InvalidArgument(format!(
            "Levenshtein distance of {} is not allowed, the maximum is {}",
            distance, MAX_FUZZINESS
        ))
    })?;
    Ok(cell.get_or_init(|| LevenshteinAutomatonBuilder::new(distance, true)))
}

struct LevenshteinDfa(DFA);

impl Automaton for LevenshteinDfa {
    type State = u32;

    fn start(&self) -> Self::State {
        self.0.initial_state()
    }

    fn is_match(&self, state: &Self::State) -> bool {
        matches!(self.0.distance(*state), Distance::Exact(_))
    }

    fn can_match(&self, state: &Self::State) -> bool {
        *state != levenshtein_automata::SINK_STATE
    }

    fn accept(&self, state: &Self::State, byte: u8) -> Self::State {
        self.0.transition(*state, byte)
    }
}
