// Answers whether the process may write to privileged device files
pub trait PrivilegeCheck {
    fn is_superuser(&self) -> bool;
}

// Query the effective user id of the running process
#[derive(Debug, Default, Clone, Copy)]
pub struct EffectiveUser;

#[cfg(unix)]
impl PrivilegeCheck for EffectiveUser {
    fn is_superuser(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }
}

#[cfg(not(unix))]
impl PrivilegeCheck for EffectiveUser {
    fn is_superuser(&self) -> bool {
        false
    }
}
