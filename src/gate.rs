use std::fmt;
use thiserror::Error;

/// Shared-secret check that unlocks editing for the rest of the session.
///
/// This is a convenience lock on this client only.  Nothing on the store side
/// enforces it.
#[derive(Clone, Eq, PartialEq)]
pub(crate) struct PasscodeGate {
    secret: String,
    unlocked: bool,
}

impl PasscodeGate {
    pub(crate) fn new<S: Into<String>>(secret: S) -> PasscodeGate {
        PasscodeGate {
            secret: secret.into(),
            unlocked: false,
        }
    }

    pub(crate) fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Compare `input` against the secret.  A mismatch clears `input`; a
    /// match unlocks the gate for good.
    pub(crate) fn submit(&mut self, input: &mut String) -> Result<(), IncorrectPasscode> {
        if *input == self.secret {
            self.unlocked = true;
            tracing::info!("Passcode accepted; editing unlocked");
            Ok(())
        } else {
            input.clear();
            tracing::info!("Incorrect passcode entered");
            Err(IncorrectPasscode)
        }
    }
}

impl fmt::Debug for PasscodeGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasscodeGate")
            .field("unlocked", &self.unlocked)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("Incorrect passcode.")]
pub(crate) struct IncorrectPasscode;
