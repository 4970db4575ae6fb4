mod request_ctx_tests;
