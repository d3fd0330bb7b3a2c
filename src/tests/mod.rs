mod test_fixed_window;
mod test_options_validation;
mod test_result_headers;
mod test_sliding_window;
