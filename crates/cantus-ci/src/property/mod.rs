//! Property exchange common rules: JSON headers, body encodings, the standard
//! resources and the responder/initiator side property state.

mod encoding;
pub use encoding::{
    decode_ascii, decode_body, decode_mcoded7, decode_zlib, encode_ascii, encode_body, encode_mcoded7,
    encode_zlib,
};

mod headers;
pub use headers::{
    data_request_header, header_bool, header_integer, header_string, parse_json, property_id_for_header,
    status_header, subscription_header, to_json_bytes, RequestHeader,
};

mod resource;
pub use resource::{default_resources, PropertyMetadata, PropertyResourceColumn, PropertySetAccess};

mod service;
pub use service::{CommonRulesPropertyService, PropertySubscription};

mod client;
pub use client::{ClientPropertyList, ClientPropertyValue, PropertyValueUpdate};

pub mod header_keys {
    pub const RESOURCE: &str = "resource";
    pub const RES_ID: &str = "resId";
    pub const MUTUAL_ENCODING: &str = "mutualEncoding";
    pub const MEDIA_TYPE: &str = "mediaType";
    pub const STATUS: &str = "status";
    pub const MESSAGE: &str = "message";
    pub const CACHE_TIME: &str = "cacheTime";
    pub const SET_PARTIAL: &str = "setPartial";
    pub const COMMAND: &str = "command";
    pub const SUBSCRIBE_ID: &str = "subscribeId";
}

pub mod property_status {
    pub const OK: u16 = 200;
    pub const ACCEPTED: u16 = 202;
    pub const RESOURCE_UNAVAILABLE_OR_ERROR: u16 = 341;
    pub const BAD_DATA: u16 = 342;
    pub const TOO_MANY_REQUESTS: u16 = 343;
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const NOT_ALLOWED: u16 = 405;
    pub const PAYLOAD_TOO_LARGE: u16 = 413;
    pub const UNSUPPORTED_MEDIA_TYPE: u16 = 415;
    pub const INVALID_DATA_VERSION: u16 = 445;
    pub const INTERNAL_ERROR: u16 = 500;
}

pub mod property_encoding {
    pub const ASCII: &str = "ASCII";
    pub const MCODED7: &str = "Mcoded7";
    pub const ZLIB_MCODED7: &str = "zlib+Mcoded7";
}

pub mod resource_names {
    pub const RESOURCE_LIST: &str = "ResourceList";
    pub const DEVICE_INFO: &str = "DeviceInfo";
    pub const CHANNEL_LIST: &str = "ChannelList";
    pub const JSON_SCHEMA: &str = "JSONSchema";
    pub const MODE_LIST: &str = "ModeList";
    pub const CURRENT_MODE: &str = "CurrentMode";
    pub const CHANNEL_MODE: &str = "ChannelMode";
    pub const BASIC_CHANNEL_RX: &str = "BasicChannelRx";
    pub const BASIC_CHANNEL_TX: &str = "BasicChannelTx";
    pub const LOCAL_ON: &str = "LocalOn";
    pub const EXTERNAL_SYNC: &str = "ExternalSync";

    /// Resources answered with an empty object until a value is stored.
    pub const PLACEHOLDERS: [&str; 9] = [
        CHANNEL_LIST,
        JSON_SCHEMA,
        MODE_LIST,
        CURRENT_MODE,
        CHANNEL_MODE,
        BASIC_CHANNEL_RX,
        BASIC_CHANNEL_TX,
        LOCAL_ON,
        EXTERNAL_SYNC,
    ];
}

pub mod device_info_keys {
    pub const MANUFACTURER_ID: &str = "manufacturerId";
    pub const FAMILY_ID: &str = "familyId";
    pub const MODEL_ID: &str = "modelId";
    pub const VERSION_ID: &str = "versionId";
    pub const MANUFACTURER: &str = "manufacturer";
    pub const FAMILY: &str = "family";
    pub const MODEL: &str = "model";
    pub const VERSION: &str = "version";
    pub const SERIAL_NUMBER: &str = "serialNumber";
}

pub mod subscription_command {
    pub const START: &str = "start";
    pub const PARTIAL: &str = "partial";
    pub const FULL: &str = "full";
    pub const NOTIFY: &str = "notify";
    pub const END: &str = "end";
}
