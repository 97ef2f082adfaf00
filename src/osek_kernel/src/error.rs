//! Status codes and per-service error types
use core::fmt;

/// The macro to define [`StatusType`].
macro_rules! define_status_type {
    (
        $( #[$meta:meta] )*
        pub enum StatusType {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident = $vd:expr
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        pub enum StatusType {
            $(
                $( #[$vmeta] )*
                $vname = $vd
            ),*
        }

        impl StatusType {
            /// Get the short name of the status code.
            ///
            /// # Examples
            ///
            /// ```
            /// use osek_kernel::StatusType;
            /// assert_eq!(StatusType::CallLevel.as_str(), "CallLevel");
            /// ```
            pub fn as_str(self) -> &'static str {
                match self {
                    $(
                        Self::$vname => stringify!($vname),
                    )*
                }
            }

            fn fmt(self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl fmt::Debug for StatusType {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                (*self).fmt(f)
            }
        }
    };
}

define_status_type! {
    /// All status codes (including success) that a kernel service can
    /// produce.
    ///
    /// The discriminants are the standard OSEK/VDX `StatusType` values.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[repr(u8)]
    pub enum StatusType {
        /// The service completed successfully (`E_OK`).
        Ok = 0,
        /// The caller's configuration forbids the operation, e.g., a task
        /// allowing multiple queued activations tried to block
        /// (`E_OS_ACCESS`).
        Access = 1,
        /// The service was called from a context in which it's not allowed,
        /// e.g., interrupt level (`E_OS_CALLEVEL`).
        CallLevel = 2,
        /// An object identifier is out of range (`E_OS_ID`).
        Id = 3,
        /// An activation couldn't be recorded because the task already has
        /// the configured maximum number of pending activations
        /// (`E_OS_LIMIT`).
        Limit = 4,
        /// The target object is in a state that disallows the operation
        /// (`E_OS_STATE`).
        State = 7,
    }
}

impl StatusType {
    /// Get the numeric encoding of the status code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Defines a public error type covering a subset of [`StatusType`].
macro_rules! define_error {
    (
        $( #[doc $( $doc:tt )*] )*
        $vis:vis enum $Name:ident {
            $( $Variant:ident, )*
        }
    ) => {
        $( #[doc $( $doc )*] )*
        #[repr(u8)]
        #[derive(PartialEq, Eq, Copy, Clone)]
        $vis enum $Name {
            $( $Variant = StatusType::$Variant as _ ),*
        }

        impl fmt::Debug for $Name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                StatusType::from(*self).fmt(f)
            }
        }

        impl From<$Name> for StatusType {
            #[inline]
            fn from(x: $Name) -> Self {
                match x {
                    $( $Name::$Variant => Self::$Variant ),*
                }
            }
        }
    };
}

define_error! {
    /// Error type for [`Kernel::activate_task`](crate::Kernel::activate_task).
    pub enum ActivateTaskError {
        Id,
        Limit,
    }
}

define_error! {
    /// Error type for [`Kernel::terminate_task`](crate::Kernel::terminate_task).
    pub enum TerminateTaskError {
        CallLevel,
    }
}

define_error! {
    /// Error type for [`Kernel::chain_task`](crate::Kernel::chain_task).
    pub enum ChainTaskError {
        CallLevel,
        Id,
        Limit,
    }
}

define_error! {
    /// Error type for [`Kernel::get_task_state`](crate::Kernel::get_task_state).
    pub enum GetTaskStateError {
        Id,
    }
}

define_error! {
    /// Error type for [`Kernel::schedule`](crate::Kernel::schedule).
    pub enum ScheduleError {
        CallLevel,
    }
}

define_error! {
    /// Error type for [`Kernel::wait_semaphore`](crate::Kernel::wait_semaphore).
    pub enum WaitSemaphoreError {
        CallLevel,
        Id,
        Access,
    }
}

define_error! {
    /// Error type for [`Kernel::post_semaphore`](crate::Kernel::post_semaphore).
    pub enum PostSemaphoreError {
        Id,
    }
}

define_error! {
    /// Error type for [`Kernel::semaphore_value`](crate::Kernel::semaphore_value).
    pub enum GetSemaphoreError {
        Id,
    }
}

define_error! {
    /// Error type for [`Kernel::set_event`](crate::Kernel::set_event).
    pub enum SetEventError {
        Id,
        Access,
        State,
    }
}

define_error! {
    /// Error type for [`Kernel::clear_event`](crate::Kernel::clear_event).
    pub enum ClearEventError {
        CallLevel,
        Access,
    }
}

define_error! {
    /// Error type for [`Kernel::get_event`](crate::Kernel::get_event).
    pub enum GetEventError {
        Id,
        Access,
        State,
    }
}

define_error! {
    /// Error type for [`Kernel::wait_event`](crate::Kernel::wait_event).
    pub enum WaitEventError {
        CallLevel,
        Access,
    }
}

macro_rules! define_suberror {
    (
        $( #[doc $( $doc:tt )*] )*
        $( #[into( $Supererror:path )] )*
        $vis:vis enum $Name:ident {
            $( $Variant:ident, )*
        }
    ) => {
        $( #[doc $( $doc )*] )*
        #[repr(u8)]
        #[derive(PartialEq, Eq, Copy, Clone)]
        $vis enum $Name {
            $( $Variant = StatusType::$Variant as _ ),*
        }

        impl fmt::Debug for $Name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                StatusType::from(*self).fmt(f)
            }
        }

        define_suberror! {
            @into
            #[into(StatusType)]
            $( #[into( $Supererror )] )*
            enum $Name {
                $( $Variant, )*
            }
        }
    };

    (
        @into
        #[into( $Supererror0:path )]
        $( #[into( $Supererror:path )] )*
        enum $Name:ident {
            $( $Variant:ident, )*
        }
    ) => {
        impl From<$Name> for $Supererror0 {
            #[inline]
            fn from(x: $Name) -> Self {
                match x {
                    $( $Name::$Variant => Self::$Variant ),*
                }
            }
        }

        define_suberror! {
            @into
            $( #[into( $Supererror )] )*
            enum $Name {
                $( $Variant, )*
            }
        }
    };

    ( @into enum $($_:tt)* ) => {};
}

define_suberror! {
    /// `Id`
    #[into(ActivateTaskError)]
    #[into(ChainTaskError)]
    #[into(GetTaskStateError)]
    #[into(WaitSemaphoreError)]
    #[into(PostSemaphoreError)]
    #[into(GetSemaphoreError)]
    #[into(SetEventError)]
    #[into(GetEventError)]
    pub(super) enum BadIdError {
        Id,
    }
}

define_suberror! {
    /// `Limit`
    #[into(ActivateTaskError)]
    #[into(ChainTaskError)]
    pub(super) enum LimitError {
        Limit,
    }
}

define_suberror! {
    /// `CallLevel`
    #[into(TerminateTaskError)]
    #[into(ChainTaskError)]
    #[into(ScheduleError)]
    #[into(WaitSemaphoreError)]
    #[into(ClearEventError)]
    #[into(WaitEventError)]
    pub(super) enum CallLevelError {
        CallLevel,
    }
}

define_suberror! {
    /// `Access`
    #[into(WaitSemaphoreError)]
    #[into(SetEventError)]
    #[into(ClearEventError)]
    #[into(GetEventError)]
    #[into(WaitEventError)]
    pub(super) enum AccessError {
        Access,
    }
}

define_suberror! {
    /// `State`
    #[into(SetEventError)]
    #[into(GetEventError)]
    pub(super) enum StateError {
        State,
    }
}

/// Error type for [`Kernel::new`](crate::Kernel::new). Reports a static
/// configuration that the kernel can't run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CfgError {
    /// The task's priority is not less than
    /// [`NUM_TASK_PRIORITY_LEVELS`](crate::NUM_TASK_PRIORITY_LEVELS).
    BadPriority { task: usize },
    /// The task's `max_activate_count` is zero.
    ZeroActivations { task: usize },
    /// An extended task allows more than one pending activation.
    ExtendedMultipleActivations { task: usize },
}

impl fmt::Display for CfgError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::BadPriority { task } => write!(
                f,
                "task {task}: priority must be less than {}",
                crate::NUM_TASK_PRIORITY_LEVELS
            ),
            Self::ZeroActivations { task } => {
                write!(f, "task {task}: `max_activate_count` must be at least 1")
            }
            Self::ExtendedMultipleActivations { task } => write!(
                f,
                "task {task}: an extended task can't have multiple pending activations"
            ),
        }
    }
}
