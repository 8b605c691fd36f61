//! Typed state merge.
//!
//! Every pipeline state has a companion patch whose fields are all optional.
//! Nodes return a patch; the graph folds it into the state so that fields a
//! node leaves unset keep their previous value.

/// State carried through a workflow graph.
pub trait GraphState: Send + Sync + Sized + 'static {
    type Patch: Default + Send;

    /// Overwrite exactly the fields `patch` sets.
    fn merge(self, patch: Self::Patch) -> Self;
}

/// Copy each listed `Option` field from a patch onto a state when it is set.
///
/// ```ignore
/// fn merge(mut self, patch: SideJobPatch) -> Self {
///     overlay!(self, patch, { ai_result, saved_entities });
///     self
/// }
/// ```
#[macro_export]
macro_rules! overlay {
    ($state:ident, $patch:ident, { $($field:ident),+ $(,)? }) => {
        $(
            if let Some(value) = $patch.$field {
                $state.$field = Some(value);
            }
        )+
    };
}
