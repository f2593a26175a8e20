//! Builders for actions and reactions.

use std::panic::Location;

use icon_common::{ActionInstanceId, ReactionHandle, ReactionId, SlotPartMap};
use icon_wire::AnyMessage;
use icon_wire::session as wire_session;

use crate::condition::Condition;

/// Callback invoked from the watcher loop when a reaction fires.
pub type ReactionCallback = Box<dyn FnMut() + Send>;

/// Describes a reaction: a condition evaluated in real time on the robot,
/// plus the events to trigger when it becomes true.
///
/// A reaction triggers when its condition is true at activation, or on a
/// rising edge while active. It is active while its associated action is
/// active, or for the whole session when added free-standing.
pub struct ReactionDescriptor {
    condition: Condition,
    response_action_id: Option<ActionInstanceId>,
    stop_associated_action: bool,
    callback: Option<ReactionCallback>,
    handle: Option<(ReactionHandle, &'static Location<'static>)>,
    realtime_signal_name: Option<String>,
    fire_once: bool,
}

impl ReactionDescriptor {
    /// Creates a descriptor with the given condition.
    pub fn new(condition: impl Into<Condition>) -> Self {
        Self {
            condition: condition.into(),
            response_action_id: None,
            stop_associated_action: false,
            callback: None,
            handle: None,
            realtime_signal_name: None,
            fire_once: false,
        }
    }

    /// Associates a handle with this reaction, so its callback can later be
    /// addressed. The handle must be unique within the session; the calling
    /// code location is captured for the duplicate-handle diagnostic.
    #[track_caller]
    pub fn with_handle(mut self, handle: ReactionHandle) -> Self {
        self.handle = Some((handle, Location::caller()));
        self
    }

    /// On condition, switches to `action_id` in the realtime context,
    /// stopping the action this reaction is attached to. Only one target
    /// may be set; later calls to this or
    /// [`with_parallel_realtime_action_on_condition`](Self::with_parallel_realtime_action_on_condition)
    /// replace it.
    pub fn with_realtime_action_on_condition(mut self, action_id: ActionInstanceId) -> Self {
        self.response_action_id = Some(action_id);
        self.stop_associated_action = true;
        self
    }

    /// On condition, starts `action_id` in parallel in the realtime
    /// context. The target action and the action this reaction is attached
    /// to must use non-overlapping part sets; otherwise adding the reaction
    /// fails on the server. Later calls to this or
    /// [`with_realtime_action_on_condition`](Self::with_realtime_action_on_condition)
    /// replace the target.
    pub fn with_parallel_realtime_action_on_condition(
        mut self,
        action_id: ActionInstanceId,
    ) -> Self {
        self.response_action_id = Some(action_id);
        self.stop_associated_action = false;
        self
    }

    /// Adds a callback invoked from the watcher loop each time the
    /// condition occurs. Only one callback may be set; later calls replace
    /// it.
    pub fn with_watcher_on_condition(mut self, on_condition: impl FnMut() + Send + 'static) -> Self {
        self.callback = Some(Box::new(on_condition));
        self
    }

    /// On condition, raises the named realtime signal on the associated
    /// action.
    pub fn with_realtime_signal_on_condition(
        mut self,
        realtime_signal_name: impl Into<String>,
    ) -> Self {
        self.realtime_signal_name = Some(realtime_signal_name.into());
        self
    }

    /// Configures repeated triggering. With `enable` the reaction fires at
    /// most once per activation of its associated action (or once overall
    /// when free-standing); otherwise it fires on every rising edge. The
    /// default is `false`.
    pub fn fire_once(mut self, enable: bool) -> Self {
        self.fire_once = enable;
        self
    }

    pub(crate) fn handle(&self) -> Option<(ReactionHandle, &'static Location<'static>)> {
        self.handle
    }

    /// Lowers the descriptor to its wire form, applied to `action_id` or
    /// free-standing when `action_id` is `None`. Returns the wire reaction
    /// together with the callback and handle binding to persist on
    /// success.
    pub(crate) fn into_wire_parts(
        self,
        reaction_id: ReactionId,
        action_id: Option<ActionInstanceId>,
    ) -> (
        wire_session::Reaction,
        Option<ReactionCallback>,
        Option<(ReactionHandle, &'static Location<'static>)>,
    ) {
        let action_association = action_id.map(|id| wire_session::ActionAssociation {
            action_instance_id: id.value(),
            stop_associated_action: self.stop_associated_action,
            triggered_signal_name: self.realtime_signal_name.clone(),
        });
        let response = self
            .response_action_id
            .map(|id| wire_session::ReactionResponse {
                start_action_instance_id: id.value(),
            });
        let reaction = wire_session::Reaction {
            reaction_instance_id: reaction_id.value(),
            condition: self.condition.to_wire(),
            fire_once: self.fire_once,
            action_association,
            response,
        };
        (reaction, self.callback, self.handle)
    }
}

/// Slot binding of an action: an explicit map, or a single part name from
/// which the server infers the map for single-slot action types.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotBinding {
    Map(SlotPartMap),
    PartName(String),
}

impl From<SlotPartMap> for SlotBinding {
    fn from(map: SlotPartMap) -> Self {
        Self::Map(map)
    }
}

impl From<&str> for SlotBinding {
    fn from(part_name: &str) -> Self {
        Self::PartName(part_name.to_string())
    }
}

impl From<String> for SlotBinding {
    fn from(part_name: String) -> Self {
        Self::PartName(part_name)
    }
}

/// Describes an action to be added to a session.
///
/// `action_type_name` must exist on the server and `action_id` must be
/// unique within the session.
pub struct ActionDescriptor {
    action_type_name: String,
    action_id: ActionInstanceId,
    slot_binding: SlotBinding,
    fixed_params: Option<AnyMessage>,
    reaction_descriptors: Vec<ReactionDescriptor>,
}

impl ActionDescriptor {
    pub fn new(
        action_type_name: impl Into<String>,
        action_id: ActionInstanceId,
        slot_binding: impl Into<SlotBinding>,
    ) -> Self {
        Self {
            action_type_name: action_type_name.into(),
            action_id,
            slot_binding: slot_binding.into(),
            fixed_params: None,
            reaction_descriptors: Vec::new(),
        }
    }

    /// Sets the fixed parameters of the action, replacing any previous
    /// ones. The parameter schema is determined by the action type.
    pub fn with_fixed_params(mut self, fixed_params: AnyMessage) -> Self {
        self.fixed_params = Some(fixed_params);
        self
    }

    /// Appends a reaction to the action. Reactions trigger while the
    /// action is active.
    pub fn with_reaction(mut self, reaction_descriptor: ReactionDescriptor) -> Self {
        self.reaction_descriptors.push(reaction_descriptor);
        self
    }

    pub fn id(&self) -> ActionInstanceId {
        self.action_id
    }

    pub(crate) fn reaction_descriptors(&self) -> &[ReactionDescriptor] {
        &self.reaction_descriptors
    }

    pub(crate) fn into_wire_parts(self) -> (wire_session::ActionInstance, Vec<ReactionDescriptor>) {
        let slot_data = match self.slot_binding {
            SlotBinding::Map(map) => wire_session::SlotData::SlotPartMap(map),
            SlotBinding::PartName(name) => wire_session::SlotData::PartName(name),
        };
        (
            wire_session::ActionInstance {
                action_type_name: self.action_type_name,
                action_instance_id: self.action_id.value(),
                slot_data,
                fixed_parameters: self.fixed_params,
            },
            self.reaction_descriptors,
        )
    }
}

/// Handle to an action that has been added to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    id: ActionInstanceId,
}

impl Action {
    pub(crate) fn new(id: ActionInstanceId) -> Self {
        Self { id }
    }

    /// The id given to the [`ActionDescriptor`] this action was created
    /// from.
    pub fn id(&self) -> ActionInstanceId {
        self.id
    }
}
