use crate::auth::AuthState;

/// Why a translation call was allowed, or that it wasn't.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Authenticated,
    Free,
    SignInRequired,
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Self::SignInRequired)
    }
}

/// One free translation per anonymous session, unlimited once signed in.
///
/// Admitting a free call reserves the entitlement until that call finishes,
/// so overlapping calls cannot both ride on it.
#[derive(Clone, Debug, Default)]
pub struct EntitlementGate {
    free_used: bool,
    free_in_flight: bool,
}

impl EntitlementGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, auth: &AuthState) -> Admission {
        if auth.is_authenticated() {
            Admission::Authenticated
        } else if self.free_used || self.free_in_flight {
            Admission::SignInRequired
        } else {
            self.free_in_flight = true;
            Admission::Free
        }
    }

    /// Settles a call admitted as `admission`. Only a successful free call
    /// consumes the entitlement; a failed one hands it back.
    pub fn finish(&mut self, admission: Admission, succeeded: bool) {
        if admission == Admission::Free {
            self.free_in_flight = false;
            self.free_used |= succeeded;
        }
    }

    pub fn free_used(&self) -> bool {
        self.free_used
    }
}
