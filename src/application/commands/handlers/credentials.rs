//! 凭证解析：请求凭证优先，其次是配置中的默认凭证

use crate::application::error::ApplicationError;
use crate::application::ports::Credentials;

pub(crate) fn resolve_credentials(
    requested: Option<Credentials>,
    fallback: Option<&Credentials>,
) -> Result<Credentials, ApplicationError> {
    requested
        .or_else(|| fallback.cloned())
        .ok_or(ApplicationError::MissingCredentials)
}
