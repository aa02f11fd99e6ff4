mod frame_count;
mod status_properties;
