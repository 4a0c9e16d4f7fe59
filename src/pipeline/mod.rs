// Request pipeline module - turns an optimize request into an engine call and
// a response envelope

pub mod content_type;
pub mod context;
pub mod handler;
pub mod operations;
pub mod path;
pub mod placeholder;
pub mod query;
pub mod response;

pub use content_type::resolve_content_type;
pub use context::{RequestContext, ResponseMode};
pub use handler::{route_segments, OptimizeRequest, RequestHandler};
pub use operations::{
    build_operations, has_operation_params, CanonicalOperation, OperationKey, OperationKind,
    OperationSpec, OPERATION_TABLE,
};
pub use path::{decode_uri_component, parse_image_path, restore_protocol_slashes, ImageLocator};
pub use placeholder::{
    build_blur_placeholder_operations, encode_data_url, is_blur_placeholder,
    remove_placeholder_params_from_url, wants_json, PlaceholderDescriptor, PlaceholderPlan,
};
pub use query::QueryParams;
pub use response::{ErrorBody, HttpResponse, ResponseEnvelope};
