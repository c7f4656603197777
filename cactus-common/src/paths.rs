// -----------------------------------------------------------------------------
// REST paths, relative to the API base url
// -----------------------------------------------------------------------------

pub const PATH_VMS: &str = "vms/";
pub const PATH_REPO_VALIDATE: &str = "repos/validate/";

pub fn vm(instance_id: &str) -> String {
    format!("vms/{}", instance_id)
}

pub fn vm_status(instance_id: &str) -> String {
    format!("vms/{}/status", instance_id)
}

/// The repository value is appended as typed; the server route captures the
/// remainder of the path, slashes included.
pub fn repo_validate(repo_url: &str) -> String {
    format!("{}{}", PATH_REPO_VALIDATE, repo_url)
}
